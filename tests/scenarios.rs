use approx::assert_relative_eq;
use dogsim::models::*;
use dogsim::scenario::ScenarioConfig;
use dogsim::simulation::{EndReason, SimulationEngine};

fn agent(config: &ScenarioConfig, id: &str, position: Vec2, velocity: Vec2) -> Agent {
    let archetype = *config.archetype("trainer").unwrap();
    Agent::new(
        id.to_string(),
        0,
        config.world_geometry(),
        archetype,
        InitialState {
            throttle: archetype.init_throttle,
            pitch: math_utils::heading_deg(velocity),
            velocity,
            position,
        },
        config.steering,
        config.projectile,
        config.world.history_scale,
    )
}

fn short_config(t_max_s: f64) -> ScenarioConfig {
    let mut config = ScenarioConfig::default();
    config.sim.t_max_s = t_max_s;
    config.targets.count = 4;
    config
}

/// 近い方のエージェントがターゲットへ向かい、もう一方は探索に移る
#[test]
fn test_nearer_agent_pursues_while_other_explores() {
    let config = ScenarioConfig::default();
    let world = config.world_geometry();
    let target_pos = Vec2::new(500.0, 300.0);
    let agents = vec![
        agent(&config, "near", Vec2::new(200.0, 300.0), Vec2::new(100.0, 0.0)),
        agent(&config, "far", Vec2::new(900.0, 300.0), Vec2::new(100.0, 0.0)),
    ];
    let targets = vec![Target::new("T0_T001".into(), target_pos, config.targets.size)];
    let mut team = Team::new(0, agents, targets, Box::new(StraightLineDistance)).unwrap();

    let initial = world.wrapped_distance(team.agents[0].position(), target_pos);
    let mut closest = initial;
    let dt = config.sim.dt_s;

    for tick in 0..90 {
        team.assign_targets().unwrap();
        assert_eq!(team.agents[0].target_index, Some(0), "tick {tick}");
        assert!(team.agents[1].target.is_none(), "tick {tick}");

        for agent in &mut team.agents {
            agent.tick(dt, &[]);
        }
        closest = closest.min(world.wrapped_distance(team.agents[0].position(), target_pos));

        assert_eq!(team.agents[0].action, SteeringAction::Pursue, "tick {tick}");
        assert!(
            matches!(
                team.agents[1].action,
                SteeringAction::Explore | SteeringAction::ExploreTiebreak
            ),
            "tick {tick}: {:?}",
            team.agents[1].action
        );
    }

    assert!(closest < initial * 0.8, "closest {closest} initial {initial}");
}

/// 何にも当たらない弾丸は直進し、ceil(寿命/dt) ティック後に消滅する
#[test]
fn test_projectile_expires_after_lifetime() {
    let config = ScenarioConfig::default();
    let world = config.world_geometry();
    let dt = 1.0 / 60.0;
    let spec = ProjectileSpec {
        speed: 10.0,
        lifetime: 0.66,
        ..config.projectile
    };
    let mut projectile = Projectile::new(
        "A_P0001".into(),
        "A".into(),
        0,
        Vec2::new(100.0, 100.0),
        0.0,
        &spec,
        world,
    );

    let expected_ticks = (0.66_f64 / dt).ceil() as u32;
    let mut ticks = 0;
    loop {
        ticks += 1;
        let expired = projectile.advance(dt);
        assert_relative_eq!(projectile.position.y, 100.0, epsilon = 1e-9);
        if expired {
            break;
        }
        assert!(ticks < 1000);
    }

    assert_eq!(ticks, expected_ticks);
    assert!(!projectile.active);
    assert_relative_eq!(
        projectile.position.x,
        100.0 + 10.0 * dt * expected_ticks as f64,
        epsilon = 1e-9
    );
}

#[test]
fn test_zero_targets_leaves_every_agent_unassigned() {
    let config = ScenarioConfig::default();
    let agents = vec![
        agent(&config, "a", Vec2::new(200.0, 200.0), Vec2::new(100.0, 0.0)),
        agent(&config, "b", Vec2::new(600.0, 400.0), Vec2::new(-100.0, 0.0)),
    ];
    for kind in [CostMetricKind::StraightLine, CostMetricKind::TwoHop, CostMetricKind::Energy] {
        let mut team = Team::new(0, agents.clone(), Vec::new(), kind.build()).unwrap();
        team.assign_targets().unwrap();
        assert!(team.agents.iter().all(|a| a.target.is_none() && a.target_index.is_none()));

        for agent in &mut team.agents {
            agent.tick(config.sim.dt_s, &[]);
            assert_ne!(agent.action, SteeringAction::Pursue);
        }
    }
}

#[test]
fn test_same_seed_gives_same_result() {
    let run = || {
        let mut engine = SimulationEngine::new(short_config(5.0), 0);
        engine.initialize().unwrap();
        let summary = engine.run().unwrap();
        (summary, engine.snapshots().len())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_headless_flag_does_not_change_outcome() {
    let run = |headless: bool| {
        let mut config = short_config(3.0);
        config.sim.headless = headless;
        let mut engine = SimulationEngine::new(config, 1);
        engine.initialize().unwrap();
        engine.run().unwrap()
    };
    assert_eq!(run(true), run(false));
}

#[test]
fn test_bundled_scenario_runs_to_completion() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/basic_dogfight.yaml");
    let mut config = ScenarioConfig::from_file(path).unwrap();
    config.sim.t_max_s = 4.0;

    let mut engine = SimulationEngine::new(config, 0);
    engine.initialize().unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.teams.len(), 2);
    assert!(summary.ticks > 0);
    if summary.end_reason == EndReason::TimeLimit {
        assert_relative_eq!(summary.sim_time, 4.0, epsilon = 1e-6);
    }
    for team in &summary.teams {
        assert!(team.targets_remaining <= 8);
    }
}
