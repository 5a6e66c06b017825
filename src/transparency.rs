use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MultiWindowResult;
use crate::platform::NativeWindow;

/// 透明模式
///
/// 与RPC协议中的整数编码一一对应：0=不透明, 1=颜色键抠除, 2=整窗固定透明度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransparencyMode {
    #[default]
    None,
    ColorKey,
    PerPixelAlpha,
}

impl TransparencyMode {
    /// 从协议整数解码，超出范围视为无效
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TransparencyMode::None),
            1 => Some(TransparencyMode::ColorKey),
            2 => Some(TransparencyMode::PerPixelAlpha),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            TransparencyMode::None => 0,
            TransparencyMode::ColorKey => 1,
            TransparencyMode::PerPixelAlpha => 2,
        }
    }
}

/// 窗口透明度配置
///
/// 各字段相互独立：`mode` 决定分层属性，`tool_window` 与 `click_through`
/// 可与任意模式组合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparencyConfig {
    /// 透明模式
    pub mode: TransparencyMode,
    /// 颜色键（24位RGB，仅ColorKey模式生效）
    pub color_key: u32,
    /// 整窗透明度（仅PerPixelAlpha模式生效）
    pub alpha: u8,
    /// 是否为工具窗口（不在任务栏显示）
    pub tool_window: bool,
    /// 是否鼠标穿透
    pub click_through: bool,
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            mode: TransparencyMode::None,
            color_key: 0x01FE01,
            alpha: 255,
            tool_window: false,
            click_through: false,
        }
    }
}

impl TransparencyConfig {
    /// 从松散类型的键值包解码
    ///
    /// 协议键名：`mode`、`colorKey`、`alpha`、`toolWindow`、`transparent`。
    /// 每个键都可缺省；类型不符或取值越界的键当作缺省处理，从不报错。
    pub fn from_bag(bag: &Value) -> Self {
        let defaults = Self::default();
        let Some(map) = bag.as_object() else {
            return defaults;
        };

        let mode = map
            .get("mode")
            .and_then(Value::as_i64)
            .and_then(TransparencyMode::from_code)
            .unwrap_or(defaults.mode);

        let color_key = map
            .get("colorKey")
            .and_then(Value::as_u64)
            .map(|v| (v & 0x00FF_FFFF) as u32)
            .unwrap_or(defaults.color_key);

        let alpha = map
            .get("alpha")
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .unwrap_or(defaults.alpha);

        let tool_window = map
            .get("toolWindow")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.tool_window);

        let click_through = map
            .get("transparent")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.click_through);

        Self {
            mode,
            color_key,
            alpha,
            tool_window,
            click_through,
        }
    }

    /// 计算扩展样式位
    pub fn style_mask(&self) -> StyleMask {
        StyleMask {
            layered: self.mode != TransparencyMode::None,
            tool_window: self.tool_window,
            click_through: self.click_through,
        }
    }

    /// 计算分层属性（两种模式互斥，同一次调用只生效一种）
    pub fn layer_attribute(&self) -> Option<LayerAttribute> {
        match self.mode {
            TransparencyMode::None => None,
            TransparencyMode::ColorKey => Some(LayerAttribute::ColorKey(self.color_key)),
            TransparencyMode::PerPixelAlpha => Some(LayerAttribute::Alpha(self.alpha)),
        }
    }
}

/// 窗口扩展样式位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleMask {
    /// 分层位，`mode != None` 时置位
    pub layered: bool,
    pub tool_window: bool,
    pub click_through: bool,
}

/// 分层属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerAttribute {
    /// 指定颜色被抠除为全透明
    ColorKey(u32),
    /// 整窗统一透明度
    Alpha(u8),
}

/// 将配置应用到原生窗口
///
/// 固定顺序：先更新样式位，再设置分层属性，最后强制重绘。
/// 中途失败会留下部分样式，由调用方决定是否吞掉错误。
pub fn apply_to(window: &dyn NativeWindow, config: &TransparencyConfig) -> MultiWindowResult<()> {
    window.set_style_mask(config.style_mask())?;
    if let Some(attribute) = config.layer_attribute() {
        window.set_layer_attribute(attribute)?;
    }
    window.redraw();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_bag() {
        let config = TransparencyConfig::from_bag(&json!({}));
        assert_eq!(config, TransparencyConfig::default());
        assert_eq!(config.mode, TransparencyMode::None);
        assert_eq!(config.color_key, 0x01FE01);
        assert_eq!(config.alpha, 255);
        assert!(!config.tool_window);
        assert!(!config.click_through);
    }

    #[test]
    fn test_defaults_from_non_object_bag() {
        assert_eq!(
            TransparencyConfig::from_bag(&json!(null)),
            TransparencyConfig::default()
        );
        assert_eq!(
            TransparencyConfig::from_bag(&json!("transparent")),
            TransparencyConfig::default()
        );
    }

    #[test]
    fn test_full_decode() {
        let config = TransparencyConfig::from_bag(&json!({
            "mode": 2,
            "colorKey": 0x00FF00,
            "alpha": 128,
            "toolWindow": true,
            "transparent": true,
        }));
        assert_eq!(config.mode, TransparencyMode::PerPixelAlpha);
        assert_eq!(config.color_key, 0x00FF00);
        assert_eq!(config.alpha, 128);
        assert!(config.tool_window);
        assert!(config.click_through);
    }

    #[test]
    fn test_mistyped_keys_fall_back_individually() {
        let config = TransparencyConfig::from_bag(&json!({
            "mode": "blue",
            "colorKey": 0x123456,
            "alpha": 400,
            "toolWindow": 1,
            "transparent": true,
        }));
        // 类型不符的键回退到默认，其余键正常解码
        assert_eq!(config.mode, TransparencyMode::None);
        assert_eq!(config.color_key, 0x123456);
        assert_eq!(config.alpha, 255);
        assert!(!config.tool_window);
        assert!(config.click_through);
    }

    #[test]
    fn test_mode_code_out_of_range() {
        assert_eq!(TransparencyMode::from_code(3), None);
        assert_eq!(TransparencyMode::from_code(-1), None);
        let config = TransparencyConfig::from_bag(&json!({ "mode": 9 }));
        assert_eq!(config.mode, TransparencyMode::None);
    }

    #[test]
    fn test_color_key_masked_to_24_bits() {
        let config = TransparencyConfig::from_bag(&json!({ "colorKey": 0xFF01FE01u64 }));
        assert_eq!(config.color_key, 0x01FE01);
    }

    #[test]
    fn test_style_mask_layered_follows_mode() {
        let color_key = TransparencyConfig {
            mode: TransparencyMode::ColorKey,
            ..Default::default()
        };
        assert!(color_key.style_mask().layered);

        let opaque = TransparencyConfig::default();
        assert!(!opaque.style_mask().layered);

        let tool_only = TransparencyConfig {
            tool_window: true,
            ..Default::default()
        };
        let mask = tool_only.style_mask();
        assert!(!mask.layered);
        assert!(mask.tool_window);
    }

    #[test]
    fn test_layer_attribute_modes_are_exclusive() {
        let color_key = TransparencyConfig {
            mode: TransparencyMode::ColorKey,
            color_key: 0x0000FF,
            ..Default::default()
        };
        assert_eq!(
            color_key.layer_attribute(),
            Some(LayerAttribute::ColorKey(0x0000FF))
        );

        let alpha = TransparencyConfig {
            mode: TransparencyMode::PerPixelAlpha,
            alpha: 64,
            ..Default::default()
        };
        assert_eq!(alpha.layer_attribute(), Some(LayerAttribute::Alpha(64)));

        assert_eq!(TransparencyConfig::default().layer_attribute(), None);
    }
}
