//! [`Runtime`] backed by `libjulia`.
//!
//! The image linked into the launcher must export `julia_main(ARGS::Vector{String})::Cint`.

use std::ffi::{CStr, c_char, c_int};
use std::marker::{PhantomData, PhantomPinned};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ImageFile, Runtime};
use crate::args::Arguments;
use crate::error::LaunchError;

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            struct $name {
                _data: [u8; 0],
                _marker: PhantomData<(*mut u8, PhantomPinned)>,
            }
        )*
    };
}

opaque!(JlValue, JlModule, JlSym);

#[cfg_attr(target_env = "msvc", link(name = "libjulia", kind = "dylib"))]
#[cfg_attr(not(target_env = "msvc"), link(name = "julia", kind = "dylib"))]
unsafe extern "C" {
    fn libsupport_init();

    fn jl_init_with_image(julia_bindir: *const c_char, image_path: *const c_char);

    #[link_name = "jl_set_ARGS"]
    fn jl_set_args(argc: c_int, argv: *mut *mut c_char);

    fn jl_symbol(name: *const c_char) -> *mut JlSym;

    fn jl_get_global(module: *mut JlModule, name: *mut JlSym) -> *mut JlValue;

    fn jl_set_global(module: *mut JlModule, name: *mut JlSym, value: *mut JlValue);

    fn jl_pchar_to_string(bytes: *const c_char, len: usize) -> *mut JlValue;

    fn jl_array_ptr_1d_push(array: *mut JlValue, value: *mut JlValue);

    fn jl_atexit_hook(status: c_int);

    #[link_name = "jl_base_module"]
    static BASE_MODULE: *mut JlModule;
}

// Exported by the image, linked through the launcher description
unsafe extern "C" {
    fn julia_main(args: *mut JlValue) -> c_int;
}

static CLAIMED: AtomicBool = AtomicBool::new(false);

/// Handle to a Julia value
#[derive(Debug, Clone, Copy)]
pub struct JuliaValue(NonNull<JlValue>);

impl JuliaValue {
    fn new(ptr: *mut JlValue, operation: &'static str) -> Result<Self, LaunchError> {
        NonNull::new(ptr)
            .map(Self)
            .ok_or(LaunchError::Runtime { operation })
    }
}

/// The process-wide Julia runtime.
///
/// At most one value of this type exists per process, so the runtime globals are written once.
#[derive(Debug)]
pub struct JuliaRuntime {
    base_module: Option<NonNull<JlModule>>,
}

impl JuliaRuntime {
    /// Takes the runtime; fails if it was already taken in this process.
    pub fn claim() -> Result<Self, LaunchError> {
        CLAIMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| LaunchError::RuntimeClaimed)?;

        Ok(Self { base_module: None })
    }

    fn base_module(&self) -> Result<*mut JlModule, LaunchError> {
        self.base_module
            .map(NonNull::as_ptr)
            .ok_or(LaunchError::Runtime {
                operation: "jl_base_module",
            })
    }

    fn symbol(name: &CStr) -> Result<*mut JlSym, LaunchError> {
        // SAFETY: `name` is null-terminated and the runtime is initialized.
        let symbol = unsafe { jl_symbol(name.as_ptr()) };
        if symbol.is_null() {
            return Err(LaunchError::Runtime {
                operation: "jl_symbol",
            });
        }

        Ok(symbol)
    }

    /// Calls the `julia_main` exported by the image with the `ARGS` list
    pub fn call_main(&mut self, args: JuliaValue) -> i32 {
        // SAFETY: the runtime is initialized and `args` is the `Base.ARGS` vector.
        unsafe { julia_main(args.0.as_ptr()) }
    }
}

impl Runtime for JuliaRuntime {
    type Value = JuliaValue;

    fn init_support(&mut self) {
        // SAFETY: called once, before any other runtime call.
        unsafe { libsupport_init() };
    }

    fn initialize(&mut self, image: &ImageFile) -> Result<(), LaunchError> {
        // SAFETY: a null bindir lets the runtime locate itself; the image name is null-terminated.
        unsafe { jl_init_with_image(std::ptr::null(), image.as_c_str().as_ptr()) };

        // SAFETY: the base module is set during initialization and never changes afterwards.
        self.base_module = NonNull::new(unsafe { BASE_MODULE });
        self.base_module()?;

        Ok(())
    }

    fn set_raw_args(&mut self, args: &Arguments) -> Result<(), LaunchError> {
        let argc = c_int::try_from(args.len()).map_err(|_| LaunchError::Runtime {
            operation: "jl_set_ARGS",
        })?;
        let mut argv: Vec<*mut c_char> = args.iter().map(|arg| arg.as_ptr().cast_mut()).collect();

        // SAFETY: the runtime copies each argument into a new string and does not write through `argv`.
        unsafe { jl_set_args(argc, argv.as_mut_ptr()) };

        Ok(())
    }

    fn global(&mut self, name: &CStr) -> Result<JuliaValue, LaunchError> {
        let module = self.base_module()?;
        let symbol = Self::symbol(name)?;

        // SAFETY: `module` and `symbol` come from the initialized runtime.
        JuliaValue::new(unsafe { jl_get_global(module, symbol) }, "jl_get_global")
    }

    fn set_global(&mut self, name: &CStr, value: JuliaValue) -> Result<(), LaunchError> {
        let module = self.base_module()?;
        let symbol = Self::symbol(name)?;

        // SAFETY: `module`, `symbol` and `value` come from the initialized runtime.
        unsafe { jl_set_global(module, symbol, value.0.as_ptr()) };

        Ok(())
    }

    fn make_string(&mut self, bytes: &CStr) -> Result<JuliaValue, LaunchError> {
        let bytes = bytes.to_bytes();

        // SAFETY: the runtime copies `len` bytes out of the buffer.
        let string = unsafe { jl_pchar_to_string(bytes.as_ptr().cast(), bytes.len()) };
        JuliaValue::new(string, "jl_pchar_to_string")
    }

    fn append_to_list(&mut self, list: JuliaValue, value: JuliaValue) -> Result<(), LaunchError> {
        // SAFETY: `list` is a `Vector{String}` and `value` a `String`, both from the runtime.
        unsafe { jl_array_ptr_1d_push(list.0.as_ptr(), value.0.as_ptr()) };

        Ok(())
    }

    fn shutdown(&mut self, code: i32) {
        // SAFETY: the runtime is initialized; nothing uses it after this call.
        unsafe { jl_atexit_hook(code) };
    }
}
