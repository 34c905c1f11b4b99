//! # dogsim
//!
//! 2Dドッグファイトシミュレーション
//!
//! 横方向に折り返す矩形ワールドで2チームの航空機エージェントが
//! 相手チームのターゲットを奪い合います。各ティックで以下を行います。
//!
//! 1. チームごとのターゲット最適割り当て（[`assignment`]）
//! 2. 知覚・操舵・射撃・飛行力学の更新（[`models`]）
//! 3. 衝突判定と終了判定（[`simulation`]）
//!
//! シナリオはYAMLで記述します（[`scenario`]）。

pub mod assignment;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
