use std::collections::BTreeMap;
use std::sync::Arc;

use crate::WindowId;
use crate::channel::WindowChannel;
use crate::engine::EngineInstance;
use crate::platform::NativeWindow;
use crate::transparency::TransparencyConfig;

/// 注册表条目
///
/// 注册表独占所有权，外部只能凭窗口id寻址。字段声明顺序即析构
/// 顺序：引擎实例先于原生窗口释放。
pub struct WindowEntry {
    pub id: WindowId,
    /// 引擎实例；主窗口(id=0)的引擎由宿主自持，此处为None
    pub engine: Option<Box<dyn EngineInstance>>,
    pub window: Arc<dyn NativeWindow>,
    /// 创建时透传给引擎的初始化参数，不做解释
    pub creation_args: String,
    /// 最近一次解码的透明度配置
    pub transparency: TransparencyConfig,
    pub channel: WindowChannel,
}

/// 注册表内部状态
///
/// id单调递增保证了BTreeMap的遍历顺序就是创建顺序。
pub struct RegistryInner {
    next_id: WindowId,
    pub entries: BTreeMap<WindowId, WindowEntry>,
}

impl RegistryInner {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    /// 分配下一个窗口id，分配出去就不再回收
    pub fn allocate_id(&mut self) -> WindowId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
