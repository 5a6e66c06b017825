use serde_json::{Map, Value};
use tracing::debug;

use crate::WindowId;
use crate::errors::MultiWindowError;
use crate::manager::MultiWindowManager;
use crate::rpc::{MethodCall, MethodReply};

/// RPC分发器
///
/// 把方法名加参数包翻译成管理器调用。主窗口与每个子窗口的引擎
/// 面对的是同一张方法表。参数不合法时直接报错，不碰原生窗口。
pub struct MethodDispatcher {
    manager: MultiWindowManager,
}

impl MethodDispatcher {
    pub fn new(manager: MultiWindowManager) -> Self {
        Self { manager }
    }

    /// 处理一次调用
    pub fn handle(&self, call: MethodCall) -> MethodReply {
        debug!("分发RPC调用: {}", call.method);
        match call.method.as_str() {
            "createWindow" => self.create_window(&call.arguments),
            "show" => self.set_visibility(&call.arguments, true),
            "hide" => self.set_visibility(&call.arguments, false),
            "close" => self.close(&call.arguments),
            "center" => self.center(&call.arguments),
            "setFrame" | "setBounds" => self.set_frame(&call.arguments),
            "setTitle" => self.set_title(&call.arguments),
            "setTransparency" => self.set_transparency(&call.arguments),
            "getAllSubWindowIds" => self.all_sub_window_ids(),
            _ => MethodReply::NotImplemented,
        }
    }

    /// 兼容两种线上形态：裸字符串是历史格式，映射是现行格式
    fn create_window(&self, arguments: &Value) -> MethodReply {
        let (creation_args, transparency) = match arguments {
            Value::String(args) => (args.as_str(), None),
            Value::Object(map) => (
                map.get("arguments").and_then(Value::as_str).unwrap_or(""),
                map.get("transparency"),
            ),
            _ => ("", None),
        };
        match self.manager.create_window(creation_args, transparency) {
            Ok(id) => MethodReply::ok(Value::from(id)),
            Err(e) => MethodReply::from_error(&e),
        }
    }

    fn set_visibility(&self, arguments: &Value, visible: bool) -> MethodReply {
        let Some(id) = bare_window_id(arguments) else {
            return invalid_argument("窗口id必须是整数");
        };
        if visible {
            self.manager.show(id);
        } else {
            self.manager.hide(id);
        }
        MethodReply::ok(Value::Null)
    }

    fn close(&self, arguments: &Value) -> MethodReply {
        let Some(id) = bare_window_id(arguments) else {
            return invalid_argument("窗口id必须是整数");
        };
        self.manager.close(id);
        MethodReply::ok(Value::Null)
    }

    fn center(&self, arguments: &Value) -> MethodReply {
        let Some(id) = bare_window_id(arguments) else {
            return invalid_argument("窗口id必须是整数");
        };
        self.manager.center(id);
        MethodReply::ok(Value::Null)
    }

    fn set_frame(&self, arguments: &Value) -> MethodReply {
        let Some(map) = arguments.as_object() else {
            return invalid_argument("参数必须是映射");
        };
        let Some(id) = mapped_window_id(map) else {
            return invalid_argument("缺少windowId");
        };
        let (Some(left), Some(top), Some(width), Some(height)) = (
            map.get("left").and_then(Value::as_f64),
            map.get("top").and_then(Value::as_f64),
            map.get("width").and_then(Value::as_f64),
            map.get("height").and_then(Value::as_f64),
        ) else {
            return invalid_argument("矩形参数必须是数值");
        };
        self.manager.set_bounds(id, left, top, width, height);
        MethodReply::ok(Value::Null)
    }

    fn set_title(&self, arguments: &Value) -> MethodReply {
        let Some(map) = arguments.as_object() else {
            return invalid_argument("参数必须是映射");
        };
        let Some(id) = mapped_window_id(map) else {
            return invalid_argument("缺少windowId");
        };
        let Some(title_value) = map.get("title") else {
            return invalid_argument("缺少title");
        };
        self.manager.set_title(id, &decode_title(title_value));
        MethodReply::ok(Value::Null)
    }

    /// 线上形态把配置键平铺在windowId旁边，剥掉id后整包转发
    fn set_transparency(&self, arguments: &Value) -> MethodReply {
        let Some(map) = arguments.as_object() else {
            return invalid_argument("参数必须是映射");
        };
        let Some(id) = mapped_window_id(map) else {
            return invalid_argument("缺少windowId");
        };
        let mut bag = map.clone();
        bag.remove("windowId");
        self.manager.set_transparency(id, &Value::Object(bag));
        MethodReply::ok(Value::Null)
    }

    fn all_sub_window_ids(&self) -> MethodReply {
        MethodReply::ok(Value::from(self.manager.all_sub_window_ids()))
    }
}

fn bare_window_id(arguments: &Value) -> Option<WindowId> {
    arguments.as_i64()
}

fn mapped_window_id(map: &Map<String, Value>) -> Option<WindowId> {
    map.get("windowId").and_then(Value::as_i64)
}

/// 标题既可能是字符串也可能是原始字节
///
/// 字节形态多出现在宿主侧未经校验的转发路径上；不是合法UTF-8时
/// 降级为空标题，从不报错。
fn decode_title(value: &Value) -> String {
    match value {
        Value::String(title) => title.clone(),
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            match bytes {
                Some(bytes) => String::from_utf8(bytes).unwrap_or_default(),
                None => String::new(),
            }
        }
        _ => String::new(),
    }
}

fn invalid_argument(message: &str) -> MethodReply {
    MethodReply::from_error(&MultiWindowError::InvalidArgument(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::{HeadlessBackend, HeadlessEmbedder};
    use serde_json::json;
    use std::sync::Arc;

    fn test_dispatcher() -> (
        MethodDispatcher,
        Arc<HeadlessBackend>,
        Arc<HeadlessEmbedder>,
    ) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let backend = Arc::new(HeadlessBackend::new());
        let embedder = Arc::new(HeadlessEmbedder::new());
        let manager = MultiWindowManager::builder()
            .with_backend(backend.clone())
            .with_embedder(embedder.clone())
            .with_default_size(400, 300)
            .build()
            .unwrap();
        (MethodDispatcher::new(manager), backend, embedder)
    }

    fn expect_id(reply: MethodReply) -> WindowId {
        match reply {
            MethodReply::Success(value) => value.as_i64().unwrap(),
            other => panic!("意外的应答: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method_is_not_implemented() {
        let (dispatcher, _, _) = test_dispatcher();
        let reply = dispatcher.handle(MethodCall::new("resizeToFit", json!(null)));
        assert_eq!(reply, MethodReply::NotImplemented);
    }

    #[test]
    fn test_create_window_legacy_string_form() {
        let (dispatcher, _, embedder) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!("legacy-args"))));
        assert_eq!(id, 1);
        assert_eq!(embedder.attached_args(id).unwrap(), "legacy-args");
    }

    #[test]
    fn test_create_window_map_form_with_transparency() {
        let (dispatcher, backend, embedder) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new(
            "createWindow",
            json!({
                "arguments": "route=/detail",
                "transparency": { "mode": 1, "toolWindow": true },
            }),
        )));

        assert_eq!(embedder.attached_args(id).unwrap(), "route=/detail");
        let state = backend.window_state(id).unwrap();
        let state = state.lock().unwrap();
        assert!(state.style_mask.layered);
        assert!(state.style_mask.tool_window);
    }

    #[test]
    fn test_create_window_null_arguments() {
        let (dispatcher, _, embedder) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(null))));
        assert_eq!(embedder.attached_args(id).unwrap(), "");
    }

    #[test]
    fn test_create_window_failure_reports_code() {
        let (dispatcher, backend, _) = test_dispatcher();
        backend.set_fail_create(true);
        let reply = dispatcher.handle(MethodCall::new("createWindow", json!("")));
        assert!(matches!(reply, MethodReply::Error { code, .. } if code == "CREATION_FAILED"));
    }

    #[test]
    fn test_show_hide_round_trip() {
        let (dispatcher, backend, _) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));
        let state = backend.window_state(id).unwrap();

        dispatcher.handle(MethodCall::new("show", json!(id)));
        assert!(state.lock().unwrap().visible);

        dispatcher.handle(MethodCall::new("hide", json!(id)));
        assert!(!state.lock().unwrap().visible);
    }

    #[test]
    fn test_non_integer_id_is_invalid_argument() {
        let (dispatcher, _, _) = test_dispatcher();
        for method in ["show", "hide", "close", "center"] {
            let reply = dispatcher.handle(MethodCall::new(method, json!("seven")));
            assert!(
                matches!(reply, MethodReply::Error { ref code, .. } if code == "INVALID_ARGUMENT"),
                "{method} 应当拒绝非整数id"
            );
        }
    }

    #[test]
    fn test_set_frame_truncates_and_validates() {
        let (dispatcher, backend, _) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));

        let reply = dispatcher.handle(MethodCall::new(
            "setFrame",
            json!({ "windowId": id, "left": 10.9, "top": 20.0, "width": 640.5, "height": 480 }),
        ));
        assert_eq!(reply, MethodReply::ok(Value::Null));
        let state = backend.window_state(id).unwrap();
        let rect = state.lock().unwrap().rect;
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (10, 20, 640, 480));

        // 缺字段在触碰原生窗口之前就被拒绝
        let reply = dispatcher.handle(MethodCall::new(
            "setFrame",
            json!({ "windowId": id, "left": 0, "top": 0, "width": 100 }),
        ));
        assert!(matches!(reply, MethodReply::Error { code, .. } if code == "INVALID_ARGUMENT"));
        assert_eq!(state.lock().unwrap().rect.x, 10);
    }

    #[test]
    fn test_set_bounds_alias() {
        let (dispatcher, backend, _) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));

        dispatcher.handle(MethodCall::new(
            "setBounds",
            json!({ "windowId": id, "left": 1, "top": 2, "width": 3, "height": 4 }),
        ));
        let state = backend.window_state(id).unwrap();
        assert_eq!(state.lock().unwrap().rect, crate::geometry::Rect::new(1, 2, 3, 4));
    }

    #[test]
    fn test_set_title_unicode_and_malformed_bytes() {
        let (dispatcher, backend, _) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));
        let state = backend.window_state(id).unwrap();

        dispatcher.handle(MethodCall::new(
            "setTitle",
            json!({ "windowId": id, "title": "café" }),
        ));
        assert_eq!(state.lock().unwrap().title, "café");

        // 非法UTF-8字节降级为空标题，调用本身成功
        let reply = dispatcher.handle(MethodCall::new(
            "setTitle",
            json!({ "windowId": id, "title": [0xff, 0xfe, 0x41] }),
        ));
        assert_eq!(reply, MethodReply::ok(Value::Null));
        assert_eq!(state.lock().unwrap().title, "");

        // 合法UTF-8字节正常解码
        dispatcher.handle(MethodCall::new(
            "setTitle",
            json!({ "windowId": id, "title": [0xc3, 0xa9] }),
        ));
        assert_eq!(state.lock().unwrap().title, "é");
    }

    #[test]
    fn test_set_transparency_strips_window_id() {
        let (dispatcher, backend, _) = test_dispatcher();
        let id = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));

        dispatcher.handle(MethodCall::new(
            "setTransparency",
            json!({ "windowId": id, "mode": 2, "alpha": 96 }),
        ));
        let state = backend.window_state(id).unwrap();
        let state = state.lock().unwrap();
        assert!(state.style_mask.layered);
        assert_eq!(
            state.layer_attribute,
            Some(crate::transparency::LayerAttribute::Alpha(96))
        );
    }

    #[test]
    fn test_get_all_sub_window_ids_reply_shape() {
        let (dispatcher, _, _) = test_dispatcher();
        let first = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));
        let second = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));
        dispatcher.handle(MethodCall::new("close", json!(first)));

        let reply = dispatcher.handle(MethodCall::new("getAllSubWindowIds", json!(null)));
        assert_eq!(reply, MethodReply::ok(json!([second])));
    }

    #[test]
    fn test_child_engine_sees_identical_surface() {
        let (dispatcher, _, embedder) = test_dispatcher();
        let first = expect_id(dispatcher.handle(MethodCall::new("createWindow", json!(""))));

        // 子窗口通过宿主句柄创建兄弟窗口，再把自己关掉
        let host = embedder.take_host(first).unwrap();
        let sibling = match host.invoke(MethodCall::new("createWindow", json!("from-child"))) {
            MethodReply::Success(value) => value.as_i64().unwrap(),
            other => panic!("意外的应答: {other:?}"),
        };
        assert_eq!(sibling, 2);

        let reply = host.invoke(MethodCall::new("close", json!(first)));
        assert_eq!(reply, MethodReply::ok(Value::Null));

        let reply = dispatcher.handle(MethodCall::new("getAllSubWindowIds", json!(null)));
        assert_eq!(reply, MethodReply::ok(json!([sibling])));
    }
}
