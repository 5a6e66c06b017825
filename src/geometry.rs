use serde::{Deserialize, Serialize};

/// 屏幕坐标系中的矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// 与另一个矩形的交叠面积
    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let w = i64::from(self.right().min(other.right())) - i64::from(self.x.max(other.x));
        let h = i64::from(self.bottom().min(other.bottom())) - i64::from(self.y.max(other.y));
        if w > 0 && h > 0 { w * h } else { 0 }
    }

    /// 中心点之间的距离平方（用于最近显示器判定）
    pub fn center_distance_sq(&self, other: &Rect) -> i64 {
        let dx = i64::from(self.x) * 2 + i64::from(self.width)
            - i64::from(other.x) * 2
            - i64::from(other.width);
        let dy = i64::from(self.y) * 2 + i64::from(self.height)
            - i64::from(other.y) * 2
            - i64::from(other.height);
        dx * dx + dy * dy
    }
}

/// 显示器信息
///
/// `rect` 为完整显示区域，`work_rect` 为去除任务栏等保留区后的工作区。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub rect: Rect,
    pub work_rect: Rect,
}

/// 选择窗口所属的显示器
///
/// 优先选交叠面积最大的显示器；窗口完全在所有屏幕之外时退回到
/// 中心点最近的显示器。
pub fn monitor_for_rect<'a>(window: &Rect, monitors: &'a [Monitor]) -> Option<&'a Monitor> {
    let best_overlap = monitors
        .iter()
        .map(|m| (m, window.intersection_area(&m.rect)))
        .max_by_key(|(_, area)| *area)?;

    if best_overlap.1 > 0 {
        return Some(best_overlap.0);
    }

    monitors
        .iter()
        .min_by_key(|m| window.center_distance_sq(&m.rect))
}

/// 计算窗口在指定区域内居中后的左上角坐标
///
/// 保持窗口尺寸不变，只返回新的位置。
pub fn center_in(window: &Rect, area: &Rect) -> (i32, i32) {
    let x = area.x + (area.width - window.width) / 2;
    let y = area.y + (area.height - window.height) / 2;
    (x, y)
}

/// 浮点坐标向零截断为整数
pub fn trunc_coord(value: f64) -> i32 {
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary_monitor() -> Monitor {
        Monitor {
            rect: Rect::new(0, 0, 1920, 1080),
            work_rect: Rect::new(0, 0, 1920, 1080),
        }
    }

    #[test]
    fn test_center_in_primary_work_area() {
        let window = Rect::new(500, 500, 400, 300);
        let (x, y) = center_in(&window, &primary_monitor().work_rect);
        assert_eq!(x, (1920 - 400) / 2);
        assert_eq!(y, (1080 - 300) / 2);
    }

    #[test]
    fn test_center_preserves_size_only_moves() {
        let window = Rect::new(-50, 2000, 800, 600);
        let (x, y) = center_in(&window, &Rect::new(100, 200, 1000, 800));
        assert_eq!((x, y), (100 + 100, 200 + 100));
    }

    #[test]
    fn test_monitor_pick_largest_overlap() {
        let left = primary_monitor();
        let right = Monitor {
            rect: Rect::new(1920, 0, 1920, 1080),
            work_rect: Rect::new(1920, 0, 1920, 1040),
        };
        let monitors = [left, right];

        // 窗口大部分在右屏
        let window = Rect::new(1800, 100, 640, 480);
        let picked = monitor_for_rect(&window, &monitors).unwrap();
        assert_eq!(picked.rect.x, 1920);
    }

    #[test]
    fn test_monitor_pick_nearest_when_offscreen() {
        let left = primary_monitor();
        let right = Monitor {
            rect: Rect::new(1920, 0, 1920, 1080),
            work_rect: Rect::new(1920, 0, 1920, 1040),
        };
        let monitors = [left, right];

        // 完全在所有屏幕下方，但横向靠右
        let window = Rect::new(3000, 5000, 300, 200);
        let picked = monitor_for_rect(&window, &monitors).unwrap();
        assert_eq!(picked.rect.x, 1920);
    }

    #[test]
    fn test_monitor_pick_empty_list() {
        let window = Rect::new(0, 0, 100, 100);
        assert!(monitor_for_rect(&window, &[]).is_none());
    }

    #[test]
    fn test_intersection_area_disjoint_is_zero() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(200, 200, 50, 50);
        assert_eq!(a.intersection_area(&b), 0);
    }

    #[test]
    fn test_trunc_coord_toward_zero() {
        assert_eq!(trunc_coord(10.9), 10);
        assert_eq!(trunc_coord(-10.9), -10);
        assert_eq!(trunc_coord(0.0), 0);
    }
}
