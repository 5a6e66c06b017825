use std::sync::Arc;

use crate::channel::{EngineMessenger, WindowHost};
use crate::platform::NativeWindow;

/// 嵌入式UI引擎的接入点
///
/// 引擎本身（渲染、输入、布局）不在本层范围内，这里只约定挂载与
/// 消息入口。`args` 为创建方传入的初始化字符串，原样透传，不做解释。
pub trait EngineEmbedder: Send + Sync {
    /// 在新创建的原生窗口上挂载一个引擎实例
    ///
    /// `host` 是引擎回调宿主的句柄，方法面与主窗口一致。
    fn attach(
        &self,
        window: &dyn NativeWindow,
        args: &str,
        host: WindowHost,
    ) -> anyhow::Result<Box<dyn EngineInstance>>;
}

/// 单个窗口内运行的引擎实例
///
/// 实例随注册表条目存活，Drop即关停引擎。
pub trait EngineInstance: Send + Sync {
    /// 该实例的消息入口
    fn messenger(&self) -> Arc<dyn EngineMessenger>;
}
