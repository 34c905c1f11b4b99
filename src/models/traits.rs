use crate::models::{
    agent::Agent,
    common::{Vec2, WorldGeometry},
};

/// 全てのシミュレーションエンティティが実装する基本インターフェース
pub trait IAgent {
    /// エンティティIDの取得
    fn get_id(&self) -> String;

    /// エンティティがアクティブかどうか
    fn is_active(&self) -> bool;
}

/// 移動可能なエンティティのインターフェース
pub trait IMovable {
    /// 現在位置（水平方向を折り返した仮想座標）の取得
    fn get_position(&self) -> Vec2;

    /// 現在速度の取得
    fn get_velocity(&self) -> Vec2;
}

/// コスト評価のインターフェース（エージェント, ターゲット → コスト）
///
/// チームは割り当てのたびに全ての (エージェント, ターゲット) 組に対して
/// これを呼び出します。値が小さいほど望ましい割り当てです。
/// 有効な入力に対しては必ず有限値を返すこと。
pub trait ICostMetric: std::fmt::Debug {
    /// 評価方式の名前（ログ用）
    fn name(&self) -> &'static str;

    /// `agent` が `targets[target_index]` を担当する場合のコスト
    ///
    /// `targets` はティック開始時に取得したターゲット座標のスナップショットです。
    fn cost(
        &self,
        agent: &Agent,
        target_index: usize,
        targets: &[Vec2],
        world: &WorldGeometry,
    ) -> f64;
}
