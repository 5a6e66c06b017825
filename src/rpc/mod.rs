//! RPC表示层
//!
//! 方法名加松散参数包进，三态应答出。未实现与失败是两种不同的
//! 应答，传输编解码不在本层范围。

mod dispatcher;

pub use dispatcher::MethodDispatcher;

use serde_json::Value;

use crate::errors::MultiWindowError;

/// 一次RPC调用
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// RPC调用的应答
#[derive(Debug, Clone, PartialEq)]
pub enum MethodReply {
    /// 调用成功，附带返回值
    Success(Value),
    /// 方法未实现，让调用方区分"没有这个方法"与"调用失败"
    NotImplemented,
    /// 调用失败，`code` 为大写下划线风格的稳定错误码
    Error { code: String, message: String },
}

impl MethodReply {
    pub fn ok(value: Value) -> Self {
        MethodReply::Success(value)
    }

    pub fn from_error(error: &MultiWindowError) -> Self {
        MethodReply::Error {
            code: error.rpc_code().to_string(),
            message: error.to_string(),
        }
    }
}
