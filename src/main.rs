use clap::{Arg, ArgAction, Command};
use dogsim::logging::{self, LogConfig, LogOutput};
use dogsim::scenario::ScenarioConfig;
use dogsim::simulation::SimulationEngine;
use tracing::error;

fn main() {
    let matches = Command::new("dogsim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("2Dドッグファイトシミュレーション (Dogfight Simulation)")
        .long_about(
            "飛行力学モデルと最適割り当てによる2Dドッグファイトシミュレーション\n\
             固定時間刻みの決定論的なバッチ実行を行い、チームごとのスコアを表示します。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help(
                    "実行するシナリオファイル(.yaml)のパスを指定します。\n\
                     指定しない場合は組み込みシナリオで実行します。",
                ),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了"),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .action(ArgAction::SetTrue)
                .help("進行状況の表示を抑制（結果は変わらない）"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("シナリオのシード値を上書き"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ"),
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let explicit_level = match matches.get_one::<String>("log-level") {
        Some(s) => match logging::parse_log_level(s) {
            Some(level) => Some(level),
            None => {
                eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", s);
                None
            }
        },
        None => None,
    };
    let log_config = LogConfig {
        level: logging::level_for_verbosity(verbose_level, explicit_level),
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        log_dir: matches
            .get_one::<String>("log-dir")
            .cloned()
            .unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    };
    // ガードはプロセス終了まで保持する
    let _log_guard = match logging::init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "2Dドッグファイトシミュレーション - dogsim v{}",
        env!("CARGO_PKG_VERSION")
    );
    println!();

    let options = RunOptions {
        scenario_path: matches.get_one::<String>("scenario").cloned(),
        info_only: matches.get_flag("info"),
        headless: matches.get_flag("headless"),
        seed: matches.get_one::<u64>("seed").copied(),
        verbose_level,
    };

    if let Err(e) = run(options) {
        error!(error = %e, "シミュレーションを実行できませんでした");
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

struct RunOptions {
    scenario_path: Option<String>,
    info_only: bool,
    headless: bool,
    seed: Option<u64>,
    verbose_level: u8,
}

/// シナリオを読み込んで実行
fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = match &options.scenario_path {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            if options.verbose_level > 0 {
                println!("シナリオファイル読み込み完了: {}", path);
            }
            scenario
        }
        None => ScenarioConfig::default(),
    };

    if options.headless {
        scenario.sim.headless = true;
    }
    if let Some(seed) = options.seed {
        scenario.sim.seed = seed;
    }

    scenario.print_summary();
    println!();
    if options.info_only {
        return Ok(());
    }

    let mut simulation = SimulationEngine::new(scenario, options.verbose_level);
    simulation.initialize()?;
    let summary = simulation.run()?;

    println!();
    summary.print();
    Ok(())
}
