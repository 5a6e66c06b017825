//! Win32后端
//!
//! 用 `CreateWindowExW` 创建顶层窗口，销毁回调装在 `GWLP_USERDATA` 里，
//! `WM_DESTROY` 时取出并通知注册表。句柄以 `isize` 保存，窗口对象因此
//! 可以跨线程持有，实际的原生调用仍应发生在创建线程上。

use std::ffi::c_void;
use std::iter::once;
use std::mem::size_of;
use std::sync::Arc;

use tracing::{debug, warn};
use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, InvalidateRect, MONITORINFO, UpdateWindow,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::{BOOL, PCWSTR, w};

use crate::errors::{MultiWindowError, MultiWindowResult};
use crate::geometry::{Monitor, Rect};
use crate::platform::{DestroySink, NativeWindow, PlatformBackend, WindowParams};
use crate::transparency::{LayerAttribute, StyleMask};

const WINDOW_CLASS_NAME: PCWSTR = w!("MultiWindowHostClass");

/// Win32窗口系统后端
///
/// 构造时注册窗口类，类在进程内只需要成功注册一次。
pub struct Win32Backend {
    hinstance_value: isize,
}

impl Win32Backend {
    pub fn new() -> MultiWindowResult<Self> {
        let hinstance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| MultiWindowError::CreationFailed(format!("获取模块句柄失败: {e}")))?
            .into();
        unsafe { register_window_class(hinstance) };
        Ok(Self {
            hinstance_value: hinstance.0 as isize,
        })
    }
}

impl PlatformBackend for Win32Backend {
    fn create_window(
        &self,
        params: &WindowParams,
        destroy_sink: DestroySink,
    ) -> MultiWindowResult<Arc<dyn NativeWindow>> {
        let title: Vec<u16> = params.title.encode_utf16().chain(once(0)).collect();
        let (x, y) = params.position.unwrap_or((CW_USEDEFAULT, CW_USEDEFAULT));
        let hinstance = HINSTANCE(self.hinstance_value as *mut c_void);

        // 不带WS_VISIBLE，窗口以隐藏状态创建，由调用方显式show
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                WINDOW_CLASS_NAME,
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPEDWINDOW,
                x,
                y,
                params.size.0,
                params.size.1,
                None,
                None,
                Some(hinstance),
                None,
            )
        }
        .map_err(|e| MultiWindowError::CreationFailed(format!("CreateWindowExW失败: {e}")))?;

        let sink = Box::into_raw(Box::new(destroy_sink));
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, sink as isize);
        }
        debug!("原生窗口已创建: id={}, hwnd={:?}", params.id, hwnd.0);

        Ok(Arc::new(Win32Window {
            hwnd_value: hwnd.0 as isize,
            owns_sink: true,
        }))
    }

    fn monitors(&self) -> Vec<Monitor> {
        unsafe extern "system" fn enum_proc(
            hmonitor: HMONITOR,
            _hdc: HDC,
            _lprc: *mut RECT,
            lparam: LPARAM,
        ) -> BOOL {
            let data_ptr = lparam.0 as *mut Vec<Monitor>;
            if data_ptr.is_null() {
                return BOOL(0);
            }
            let mut info = MONITORINFO {
                cbSize: size_of::<MONITORINFO>() as u32,
                ..Default::default()
            };
            if !unsafe { GetMonitorInfoW(hmonitor, &mut info) }.as_bool() {
                return BOOL(1);
            }
            let data = unsafe { &mut *data_ptr };
            data.push(Monitor {
                rect: rect_from_win32(&info.rcMonitor),
                work_rect: rect_from_win32(&info.rcWork),
            });
            BOOL(1)
        }

        let mut monitors: Vec<Monitor> = Vec::new();
        let lparam = LPARAM(&mut monitors as *mut _ as isize);
        let result = unsafe { EnumDisplayMonitors(None, None, Some(enum_proc), lparam) };
        if !result.as_bool() {
            warn!("显示器枚举失败");
        }
        monitors
    }
}

/// 单个Win32窗口
///
/// 句柄失效后所有原生调用返回错误，这里一律静默忽略，符合
/// "迟到的命令不是异常"的契约。
pub struct Win32Window {
    hwnd_value: isize,
    /// 销毁回调是否由本后端装入USERDATA；宿主自带的窗口为false
    owns_sink: bool,
}

impl Win32Window {
    /// 包装宿主已创建的窗口，不接管它的窗口过程与销毁通知
    pub fn from_raw(hwnd_value: isize) -> Self {
        Self {
            hwnd_value,
            owns_sink: false,
        }
    }

    fn hwnd(&self) -> HWND {
        HWND(self.hwnd_value as *mut c_void)
    }
}

/// 从宿主引擎的视图句柄解析顶层主窗口
///
/// 宿主注册插件时拿到的是引擎视图，主窗口是它的GA_ROOT祖先。
pub fn main_window_from_view(view_hwnd_value: isize) -> Arc<dyn NativeWindow> {
    let view = HWND(view_hwnd_value as *mut c_void);
    let root = unsafe { GetAncestor(view, GA_ROOT) };
    Arc::new(Win32Window::from_raw(root.0 as isize))
}

impl NativeWindow for Win32Window {
    fn outer_rect(&self) -> Option<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(self.hwnd(), &mut rect) }.ok()?;
        Some(rect_from_win32(&rect))
    }

    fn set_bounds(&self, rect: Rect) {
        unsafe {
            let _ = MoveWindow(self.hwnd(), rect.x, rect.y, rect.width, rect.height, true);
        }
    }

    fn set_visible(&self, visible: bool) {
        unsafe {
            let _ = ShowWindow(self.hwnd(), if visible { SW_SHOW } else { SW_HIDE });
        }
    }

    fn set_title(&self, title: &str) {
        let wide: Vec<u16> = title.encode_utf16().chain(once(0)).collect();
        unsafe {
            let _ = SetWindowTextW(self.hwnd(), PCWSTR(wide.as_ptr()));
        }
    }

    fn request_close(&self) {
        // 等价于用户点击关闭按钮，窗口自己的关闭确认逻辑有机会运行
        unsafe {
            let _ = PostMessageW(
                Some(self.hwnd()),
                WM_SYSCOMMAND,
                WPARAM(SC_CLOSE as usize),
                LPARAM(0),
            );
        }
    }

    fn destroy(&self) {
        let hwnd = self.hwnd();
        if self.owns_sink {
            // 回收路径上条目从未注册过，先摘掉回调再销毁
            let sink_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut DestroySink;
            if !sink_ptr.is_null() {
                unsafe {
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                    drop(Box::from_raw(sink_ptr));
                }
            }
        }
        if let Err(e) = unsafe { DestroyWindow(hwnd) } {
            warn!("DestroyWindow失败: {e}");
        }
    }

    fn set_style_mask(&self, mask: StyleMask) -> MultiWindowResult<()> {
        unsafe {
            let mut ex_style = GetWindowLongPtrW(self.hwnd(), GWL_EXSTYLE);
            apply_bit(&mut ex_style, WS_EX_LAYERED.0, mask.layered);
            apply_bit(&mut ex_style, WS_EX_TOOLWINDOW.0, mask.tool_window);
            apply_bit(&mut ex_style, WS_EX_TRANSPARENT.0, mask.click_through);
            SetWindowLongPtrW(self.hwnd(), GWL_EXSTYLE, ex_style);
        }
        Ok(())
    }

    fn set_layer_attribute(&self, attribute: LayerAttribute) -> MultiWindowResult<()> {
        let result = match attribute {
            LayerAttribute::ColorKey(key) => unsafe {
                SetLayeredWindowAttributes(self.hwnd(), COLORREF(key), 0, LWA_COLORKEY)
            },
            LayerAttribute::Alpha(alpha) => unsafe {
                SetLayeredWindowAttributes(self.hwnd(), COLORREF(0), alpha, LWA_ALPHA)
            },
        };
        result.map_err(|e| {
            MultiWindowError::TransparencyFailed(format!("SetLayeredWindowAttributes失败: {e}"))
        })
    }

    fn redraw(&self) {
        unsafe {
            let _ = InvalidateRect(Some(self.hwnd()), None, true);
            let _ = UpdateWindow(self.hwnd());
        }
    }

    fn raw_handle(&self) -> Option<isize> {
        Some(self.hwnd_value)
    }
}

unsafe fn register_window_class(hinstance: HINSTANCE) {
    let window_class = WNDCLASSW {
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(host_window_proc),
        hInstance: hinstance,
        hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
        lpszClassName: WINDOW_CLASS_NAME,
        ..Default::default()
    };
    // 重复注册返回0，可忽略
    let _atom = unsafe { RegisterClassW(&window_class) };
}

unsafe extern "system" fn host_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_DESTROY {
        let sink_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut DestroySink;
        if !sink_ptr.is_null() {
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            }
            let sink = unsafe { Box::from_raw(sink_ptr) };
            debug!("窗口销毁通知: id={}", sink.window_id());
            sink.notify();
        }
    }
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

fn apply_bit(style: &mut isize, bit: u32, on: bool) {
    if on {
        *style |= bit as isize;
    } else {
        *style &= !(bit as isize);
    }
}

fn rect_from_win32(rect: &RECT) -> Rect {
    Rect::new(
        rect.left,
        rect.top,
        rect.right - rect.left,
        rect.bottom - rect.top,
    )
}
