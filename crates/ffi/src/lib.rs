// C ABI for the Cinescope video bridge
//
// One process-wide bridge, started by the host at launch. Commands take a
// method name and a JSON argument object; results come back through a C
// callback invoked on the bridge's worker thread.

mod safety;

use cinescope_bridge::{error_payload, BridgeConfig, Command, HostLifecycle, VideoBridge};
use cinescope_core::BridgeError;
use cinescope_engine_probe::ProbeEngineFactory;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::{Arc, Once};

pub use safety::{ERR_INTERNAL, ERR_INVALID_ARG, ERR_NOT_STARTED, OK};

/// Status passed to a completion callback
pub const STATUS_OK: i32 = 0;
pub const STATUS_ERROR: i32 = 1;

/// Command completion: `payload` is the JSON result (or `{code, message}` on
/// error) and is only valid for the duration of the call.
pub type CompletionCallback =
    extern "C" fn(user_data: *mut c_void, status: i32, payload: *const c_char);

static BRIDGE: Lazy<Mutex<Option<Arc<VideoBridge>>>> = Lazy::new(|| Mutex::new(None));
static INIT_LOGGER: Once = Once::new();

fn init_logging(config: &BridgeConfig) {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder()
            .is_test(false)
            .filter_level(config.log_level)
            .try_init();
    });
}

/// Host pointer carried to the worker thread untouched
struct UserData(*mut c_void);

// The host owns the pointer and guarantees it stays valid until the callback runs
unsafe impl Send for UserData {}

/// Run `f` against the bridge without holding the global lock.
/// Calls made from a completion callback run on the worker thread and never
/// wait on it: state queries report -1, surface binding reports 0 and
/// shutdown returns without joining.
fn with_bridge<R>(f: impl FnOnce(&VideoBridge) -> R) -> Option<R> {
    let bridge = BRIDGE.lock().clone();
    bridge.map(|b| f(&b))
}

/// Read a C string argument; null or invalid UTF-8 yields `None`
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn deliver(callback: CompletionCallback, user_data: UserData, result: Result<Value, BridgeError>) {
    let (status, body) = match result {
        Ok(value) => (STATUS_OK, value),
        Err(err) => (STATUS_ERROR, error_payload(&err)),
    };
    let text = CString::new(body.to_string()).unwrap_or_default();
    callback(user_data.0, status, text.as_ptr());
}

/// Start the bridge with the headless probe engine.
/// Returns `OK`, or `1` if it was already running.
#[no_mangle]
pub extern "C" fn cinescope_bridge_start() -> i32 {
    safety::ffi_boundary("cinescope_bridge_start", || {
        let config = BridgeConfig::from_env();
        init_logging(&config);

        let mut slot = BRIDGE.lock();
        if slot.is_some() {
            log::debug!("[ffi] bridge already started");
            return 1;
        }
        match VideoBridge::with_config(config, Arc::new(ProbeEngineFactory::default())) {
            Ok(bridge) => {
                *slot = Some(Arc::new(bridge));
                OK
            }
            Err(e) => {
                log::error!("[ffi] failed to start bridge: {}", e);
                ERR_INTERNAL
            }
        }
    })
}

/// Dispatch one command.
///
/// The callback is invoked exactly once, possibly before this function
/// returns (validation failures) and otherwise on the worker thread.
/// The return value only reports whether the command was accepted.
/// The callback may call back into this ABI; queries made from it do not
/// see player state (see `with_bridge`).
///
/// # Safety
/// `method` and `args_json` must be null or NUL-terminated strings.
/// `user_data` must stay valid until the callback has run, from whichever
/// thread it runs on.
#[no_mangle]
pub unsafe extern "C" fn cinescope_bridge_dispatch(
    method: *const c_char,
    args_json: *const c_char,
    callback: Option<CompletionCallback>,
    user_data: *mut c_void,
) -> i32 {
    let callback = match callback {
        Some(cb) => cb,
        None => return ERR_INVALID_ARG,
    };
    let method = read_str(method);
    let args = read_str(args_json);

    safety::ffi_boundary("cinescope_bridge_dispatch", move || {
        let user_data = UserData(user_data);
        let method = match method {
            Some(m) => m,
            None => {
                deliver(
                    callback,
                    user_data,
                    Err(BridgeError::InvalidArgument("Missing method".to_string())),
                );
                return ERR_INVALID_ARG;
            }
        };
        let args: Value = match args.map(serde_json::from_str::<Value>) {
            Some(Ok(value)) => value,
            None => Value::Null,
            Some(Err(e)) => {
                deliver(
                    callback,
                    user_data,
                    Err(BridgeError::InvalidArgument(format!("Malformed arguments: {}", e))),
                );
                return ERR_INVALID_ARG;
            }
        };

        let command = match Command::parse(method, &args) {
            Ok(command) => command,
            Err(err) => {
                log::warn!("[ffi] rejected {}: {} {}", method, err.code(), err.message());
                deliver(callback, user_data, Err(err));
                return ERR_INVALID_ARG;
            }
        };

        let bridge = BRIDGE.lock().clone();
        match bridge {
            Some(bridge) => {
                bridge.submit_with(
                    command,
                    Box::new(move |result| deliver(callback, user_data, result)),
                );
                OK
            }
            None => {
                deliver(
                    callback,
                    user_data,
                    Err(BridgeError::Engine("bridge not started".to_string())),
                );
                ERR_NOT_STARTED
            }
        }
    })
}

/// Pause every live player
#[no_mangle]
pub extern "C" fn cinescope_bridge_pause_all() -> i32 {
    safety::ffi_boundary("cinescope_bridge_pause_all", || {
        with_bridge(|b| b.pause_all()).map_or(ERR_NOT_STARTED, |_| OK)
    })
}

/// Host lifecycle: 0 = will resign active, 1 = entered background, 2 = will terminate
#[no_mangle]
pub extern "C" fn cinescope_bridge_lifecycle(signal: i32) -> i32 {
    safety::ffi_boundary("cinescope_bridge_lifecycle", || {
        let signal = match signal {
            0 => HostLifecycle::WillResignActive,
            1 => HostLifecycle::DidEnterBackground,
            2 => HostLifecycle::WillTerminate,
            other => {
                log::warn!("[ffi] unknown lifecycle signal {}", other);
                return ERR_INVALID_ARG;
            }
        };
        with_bridge(|b| b.handle_lifecycle(signal)).map_or(ERR_NOT_STARTED, |_| OK)
    })
}

/// Lifecycle state code of a player, or -1 if unknown
#[no_mangle]
pub extern "C" fn cinescope_bridge_player_state(handle: i64) -> i32 {
    safety::ffi_boundary_or("cinescope_bridge_player_state", -1, || {
        with_bridge(|b| b.state_of(handle))
            .flatten()
            .map_or(-1, |state| state.as_code())
    })
}

/// Bind a render surface; returns the raw layer handle or 0 if none is available
#[no_mangle]
pub extern "C" fn cinescope_bridge_bind_surface(handle: i64, autoplay: bool) -> u64 {
    safety::ffi_boundary_or("cinescope_bridge_bind_surface", 0, || {
        match with_bridge(|b| b.bind_surface(handle, autoplay)) {
            Some(Ok(surface)) => surface.layer().unwrap_or(0),
            Some(Err(e)) => {
                log::warn!("[ffi] no surface for player {}: {}", handle, e);
                0
            }
            None => 0,
        }
    })
}

/// Dispose every player and stop the bridge
#[no_mangle]
pub extern "C" fn cinescope_bridge_shutdown() -> i32 {
    safety::ffi_boundary("cinescope_bridge_shutdown", || {
        let bridge = BRIDGE.lock().take();
        match bridge {
            Some(bridge) => {
                bridge.shutdown();
                OK
            }
            None => ERR_NOT_STARTED,
        }
    })
}
