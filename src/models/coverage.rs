use crate::models::common::{Vec2, WorldGeometry};

/// カバレッジマップ（探索履歴）
///
/// 世界を `scale` px 四方のセルに離散化し、2つの層を持ちます。
///
/// - 訪問層: 0 は未探索。視界円に入ったセルは正の値になり、以後0に戻らない
/// - ターゲット層: 知覚したエンティティの種類を記録
///
/// 水平方向はワールドと同様に折り返します。
#[derive(Debug, Clone)]
pub struct CoverageMap {
    pub scale: f64,
    pub cols: usize,
    pub rows: usize,
    /// 視界半径（セル単位）
    pub fov_radius_cells: f64,
    visited: Vec<f64>,
    targets: Vec<f64>,
}

impl CoverageMap {
    pub fn new(world: &WorldGeometry, scale: f64, fov_radius: f64) -> Self {
        let cols = ((world.width / scale) as usize).max(1);
        let rows = ((world.height / scale) as usize).max(1);
        Self {
            scale,
            cols,
            rows,
            fov_radius_cells: fov_radius / scale,
            visited: vec![0.0; cols * rows],
            targets: vec![0.0; cols * rows],
        }
    }

    fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    /// 座標（px）が属するセル。垂直方向の範囲外は None
    pub fn cell_of(&self, position: Vec2) -> Option<(usize, usize)> {
        if !position.is_finite() || position.y < 0.0 {
            return None;
        }
        let row = (position.y / self.scale) as usize;
        if row >= self.rows {
            return None;
        }
        let col = ((position.x / self.scale).floor() as i64).rem_euclid(self.cols as i64) as usize;
        Some((col, row))
    }

    pub fn visited_at(&self, col: usize, row: usize) -> f64 {
        self.visited[self.index(col, row)]
    }

    pub fn target_at(&self, col: usize, row: usize) -> f64 {
        self.targets[self.index(col, row)]
    }

    pub fn is_visited(&self, col: usize, row: usize) -> bool {
        self.visited_at(col, row) != 0.0
    }

    /// 探索済みセル数
    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|v| **v != 0.0).count()
    }

    /// 現在セルに訪問時刻を記録（値は減少しない）
    pub fn mark_visited(&mut self, position: Vec2, stamp: f64) {
        if let Some((col, row)) = self.cell_of(position) {
            let i = self.index(col, row);
            self.visited[i] = self.visited[i].max(stamp);
        }
    }

    /// 知覚したエンティティをターゲット層に記録
    pub fn mark_perceived(&mut self, position: Vec2, value: f64) {
        if let Some((col, row)) = self.cell_of(position) {
            let i = self.index(col, row);
            self.targets[i] = value;
        }
    }

    /// 中心 `center`（セル単位の実数座標）の視界円に含まれるセル
    fn disk_cells(&self, center: Vec2) -> Vec<(usize, usize)> {
        let r = self.fov_radius_cells;
        let r_sq = r * r;
        let mut cells = Vec::new();

        let row_lo = (center.y - r).floor().max(0.0) as i64;
        let row_hi = ((center.y + r).ceil() as i64).min(self.rows as i64 - 1);
        if row_hi < row_lo {
            return cells;
        }

        let col_lo = (center.x - r).floor() as i64;
        let col_hi = (center.x + r).ceil() as i64;
        let cols = self.cols as i64;
        let wraps_fully = col_hi - col_lo + 1 >= cols;

        for row in row_lo..=row_hi {
            let dy = row as f64 - center.y;
            if wraps_fully {
                for col in 0..cols {
                    let mut dx = (col as f64 - center.x).rem_euclid(cols as f64);
                    if dx > cols as f64 / 2.0 {
                        dx -= cols as f64;
                    }
                    if dx * dx + dy * dy < r_sq {
                        cells.push((col as usize, row as usize));
                    }
                }
            } else {
                for col in col_lo..=col_hi {
                    let dx = col as f64 - center.x;
                    if dx * dx + dy * dy < r_sq {
                        cells.push((col.rem_euclid(cols) as usize, row as usize));
                    }
                }
            }
        }
        cells
    }

    fn center_cells(&self, position: Vec2, offset_cells: Vec2) -> Vec2 {
        position / self.scale + offset_cells
    }

    /// `position` から `offset_cells` だけ移動した場合に新たに探索されるセル数
    pub fn diff_overlap_circle(&self, position: Vec2, offset_cells: Vec2) -> usize {
        self.disk_cells(self.center_cells(position, offset_cells))
            .into_iter()
            .filter(|&(col, row)| !self.is_visited(col, row))
            .count()
    }

    /// 現在位置の視界円を訪問層に書き込み、新たに探索されたセル数を返す
    pub fn paint_fov(&mut self, position: Vec2) -> usize {
        let mut newly = 0;
        for (col, row) in self.disk_cells(self.center_cells(position, Vec2::ZERO)) {
            let i = self.index(col, row);
            if self.visited[i] == 0.0 {
                self.visited[i] = 1.0;
                newly += 1;
            }
        }
        newly
    }

    /// 地面より上の未探索セルの重心（px）。未探索セルがなければ None
    pub fn unexplored_centroid(&self, ground_elevation: f64) -> Option<Vec2> {
        let row_limit = ((ground_elevation / self.scale) as usize).min(self.rows);
        let mut sum = Vec2::ZERO;
        let mut count = 0usize;

        for row in 0..row_limit {
            for col in 0..self.cols {
                if !self.is_visited(col, row) {
                    sum += Vec2::new(col as f64, row as f64);
                    count += 1;
                }
            }
        }

        if count == 0 {
            None
        } else {
            Some(sum / count as f64 * self.scale)
        }
    }
}
