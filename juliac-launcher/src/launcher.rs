use std::ffi::{CStr, OsStr};

use crate::args::{Arguments, ProcessEntry};
use crate::depot::depot_path;
use crate::error::LaunchError;
use crate::process::{ACTIVE_PROJECT, DEPOT_PATH_VAR, LOAD_PATH_VAR, Process};
use crate::runtime::{ImageFile, Runtime};

/// Global holding the arguments given to the program (argument 0 excluded)
const ARGS_GLOBAL: &CStr = c"ARGS";

/// Global naming the invoked program file
const PROGRAM_FILE_GLOBAL: &CStr = c"PROGRAM_FILE";

/// Boots a runtime from a precompiled image and hands control to the program's entry function.
///
/// A launcher runs once: [`Launcher::launch`] consumes it.
#[derive(Debug)]
pub struct Launcher<R, P> {
    runtime: R,
    process: P,
    image: ImageFile,
}

impl<R: Runtime, P: Process> Launcher<R, P> {
    /// Creates a launcher that will boot `runtime` from `image`
    pub fn new(runtime: R, process: P, image: ImageFile) -> Self {
        Self {
            runtime,
            process,
            image,
        }
    }

    /// Runs the startup sequence, calls `main` with the `ARGS` list and shuts the runtime down.
    ///
    /// Returns the value returned by `main`, which becomes the exit status of the process.
    /// Any error means `main` was never called.
    pub fn launch<E, F>(mut self, entry: &E, main: F) -> Result<i32, LaunchError>
    where
        E: ProcessEntry + ?Sized,
        F: FnOnce(&mut R, R::Value) -> i32,
    {
        let args = entry.normalize()?;
        entry.prepare_console();

        self.runtime.init_support();

        let exe = self
            .process
            .executable_path()
            .map_err(LaunchError::ExecutablePath)?;
        self.process.set_var(DEPOT_PATH_VAR, &depot_path(&exe))?;
        self.process
            .set_var(LOAD_PATH_VAR, OsStr::new(ACTIVE_PROJECT))?;

        self.runtime.initialize(&self.image)?;

        let program_args = self.install_args(&args)?;

        let code = main(&mut self.runtime, program_args);

        self.runtime.shutdown(code);

        Ok(code)
    }

    /// Writes the argument globals and returns the `ARGS` list.
    fn install_args(&mut self, args: &Arguments) -> Result<R::Value, LaunchError> {
        self.runtime.set_raw_args(args)?;

        let program_args = self.runtime.global(ARGS_GLOBAL)?;
        for arg in args.user_args() {
            let arg = self.runtime.make_string(arg)?;
            self.runtime.append_to_list(program_args, arg)?;
        }

        let program_file = self.runtime.make_string(args.program_file())?;
        self.runtime.set_global(PROGRAM_FILE_GLOBAL, program_file)?;

        Ok(program_args)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::ffi::{CStr, CString, OsStr, OsString};
    use std::io;
    use std::path::PathBuf;

    use super::Launcher;
    use crate::args::{Arguments, ProcessEntry};
    use crate::error::LaunchError;
    use crate::process::{Process, check_var};
    use crate::runtime::{ImageFile, Runtime};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Value {
        Str(Vec<u8>),
        List(Vec<usize>),
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        InitSupport,
        Initialize(String),
        SetRawArgs(usize),
        Shutdown(i32),
    }

    /// Records runtime calls and keeps values in an arena
    #[derive(Default)]
    struct FakeRuntime {
        calls: Vec<Call>,
        values: Vec<Value>,
        globals: HashMap<String, usize>,
        raw_args: Vec<Vec<u8>>,
    }

    impl FakeRuntime {
        fn alloc(&mut self, value: Value) -> usize {
            self.values.push(value);
            self.values.len() - 1
        }

        fn string(&self, handle: usize) -> &[u8] {
            match &self.values[handle] {
                Value::Str(bytes) => bytes,
                other => panic!("not a string: {other:?}"),
            }
        }

        fn list(&self, handle: usize) -> Vec<&[u8]> {
            match &self.values[handle] {
                Value::List(items) => items.iter().map(|&item| self.string(item)).collect(),
                other => panic!("not a list: {other:?}"),
            }
        }

        fn global_string(&self, name: &str) -> &[u8] {
            self.string(self.globals[name])
        }
    }

    impl Runtime for FakeRuntime {
        type Value = usize;

        fn init_support(&mut self) {
            self.calls.push(Call::InitSupport);
        }

        fn initialize(&mut self, image: &ImageFile) -> Result<(), LaunchError> {
            self.calls.push(Call::Initialize(
                image.as_c_str().to_string_lossy().into_owned(),
            ));
            let args = self.alloc(Value::List(Vec::new()));
            self.globals.insert("ARGS".into(), args);

            Ok(())
        }

        fn set_raw_args(&mut self, args: &Arguments) -> Result<(), LaunchError> {
            self.calls.push(Call::SetRawArgs(args.len()));
            self.raw_args = args.iter().map(|arg| arg.to_bytes().to_vec()).collect();

            Ok(())
        }

        fn global(&mut self, name: &CStr) -> Result<usize, LaunchError> {
            self.globals
                .get(name.to_str().unwrap())
                .copied()
                .ok_or(LaunchError::Runtime {
                    operation: "global",
                })
        }

        fn set_global(&mut self, name: &CStr, value: usize) -> Result<(), LaunchError> {
            self.globals.insert(name.to_str().unwrap().into(), value);

            Ok(())
        }

        fn make_string(&mut self, bytes: &CStr) -> Result<usize, LaunchError> {
            Ok(self.alloc(Value::Str(bytes.to_bytes().to_vec())))
        }

        fn append_to_list(&mut self, list: usize, value: usize) -> Result<(), LaunchError> {
            match &mut self.values[list] {
                Value::List(items) => items.push(value),
                Value::Str(_) => {
                    return Err(LaunchError::Runtime {
                        operation: "append_to_list",
                    });
                }
            }

            Ok(())
        }

        fn shutdown(&mut self, code: i32) {
            self.calls.push(Call::Shutdown(code));
        }
    }

    struct FakeProcess {
        exe: Result<PathBuf, io::ErrorKind>,
        env: Vec<(String, OsString)>,
    }

    impl FakeProcess {
        fn at(exe: &str) -> Self {
            Self {
                exe: Ok(exe.into()),
                env: Vec::new(),
            }
        }

        fn var(&self, name: &str) -> Option<&OsStr> {
            self.env
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_os_str())
        }
    }

    impl Process for FakeProcess {
        fn executable_path(&self) -> io::Result<PathBuf> {
            self.exe.clone().map_err(io::Error::from)
        }

        fn set_var(&mut self, name: &str, value: &OsStr) -> Result<(), LaunchError> {
            check_var(name, value)?;
            self.env.push((name.into(), value.into()));

            Ok(())
        }
    }

    struct FakeEntry {
        args: Result<Vec<&'static str>, usize>,
        console_prepared: Cell<bool>,
    }

    impl FakeEntry {
        fn new(args: &[&'static str]) -> Self {
            Self {
                args: Ok(args.to_vec()),
                console_prepared: Cell::new(false),
            }
        }
    }

    impl ProcessEntry for FakeEntry {
        fn normalize(&self) -> Result<Arguments, LaunchError> {
            match &self.args {
                Ok(args) => Ok(args.iter().map(|a| CString::new(*a).unwrap()).collect()),
                Err(index) => Err(LaunchError::ArgumentEncoding { index: *index }),
            }
        }

        fn prepare_console(&self) {
            self.console_prepared.set(true);
        }
    }

    fn image() -> ImageFile {
        ImageFile::new("app.so").unwrap()
    }

    #[test]
    fn full_sequence() {
        let mut runtime = FakeRuntime::default();
        let mut process = FakeProcess::at("/opt/app/bin/app");
        let entry = FakeEntry::new(&["/opt/app/bin/app", "one", "two", "one"]);

        let mut seen_args = Vec::new();
        let code = Launcher::new(&mut runtime, &mut process, image())
            .launch(&entry, |runtime, args| {
                seen_args = runtime
                    .list(args)
                    .into_iter()
                    .map(<[u8]>::to_vec)
                    .collect();
                0
            })
            .unwrap();

        assert_eq!(code, 0);
        assert!(entry.console_prepared.get());
        assert_eq!(seen_args, [&b"one"[..], b"two", b"one"]);
        assert_eq!(
            runtime.calls,
            [
                Call::InitSupport,
                Call::Initialize("app.so".into()),
                Call::SetRawArgs(4),
                Call::Shutdown(0),
            ]
        );
        assert_eq!(runtime.raw_args.len(), 4);
        assert_eq!(runtime.global_string("PROGRAM_FILE"), b"/opt/app/bin/app");
        assert_eq!(process.var("JULIA_LOAD_PATH"), Some(OsStr::new("@")));
    }

    #[cfg(unix)]
    #[test]
    fn depot_is_grandparent_of_executable() {
        let mut runtime = FakeRuntime::default();
        let mut process = FakeProcess::at("/opt/app/bin/app");

        Launcher::new(&mut runtime, &mut process, image())
            .launch(&FakeEntry::new(&["app"]), |_, _| 0)
            .unwrap();

        assert_eq!(process.var("JULIA_DEPOT_PATH"), Some(OsStr::new("/opt/app/")));
    }

    #[cfg(unix)]
    #[test]
    fn moving_the_executable_only_changes_the_depot_directory() {
        let mut envs = Vec::new();
        for exe in ["/opt/app/bin/app", "/home/user/dist/bin/app"] {
            let mut runtime = FakeRuntime::default();
            let mut process = FakeProcess::at(exe);
            Launcher::new(&mut runtime, &mut process, image())
                .launch(&FakeEntry::new(&["app"]), |_, _| 0)
                .unwrap();
            envs.push(process.env);
        }

        let names: Vec<Vec<&str>> = envs
            .iter()
            .map(|env| env.iter().map(|(name, _)| name.as_str()).collect())
            .collect();
        assert_eq!(names[0], ["JULIA_DEPOT_PATH", "JULIA_LOAD_PATH"]);
        assert_eq!(names[0], names[1]);
        assert_eq!(envs[0][1], envs[1][1]);
        assert_eq!(envs[1][0].1, "/home/user/dist/");
    }

    #[test]
    fn exit_code_is_returned_unchanged() {
        for expected in [0, 1, 42, -1, i32::MIN, i32::MAX] {
            let mut runtime = FakeRuntime::default();
            let mut process = FakeProcess::at("/opt/app/bin/app");

            let code = Launcher::new(&mut runtime, &mut process, image())
                .launch(&FakeEntry::new(&["app", "x"]), |_, _| expected)
                .unwrap();

            assert_eq!(code, expected);
            assert_eq!(runtime.calls.last(), Some(&Call::Shutdown(expected)));
        }
    }

    #[test]
    fn executable_path_failure_stops_before_environment_and_runtime() {
        let mut runtime = FakeRuntime::default();
        let mut process = FakeProcess {
            exe: Err(io::ErrorKind::NotFound),
            env: Vec::new(),
        };
        let called = Cell::new(false);

        let result = Launcher::new(&mut runtime, &mut process, image())
            .launch(&FakeEntry::new(&["app"]), |_, _| {
                called.set(true);
                0
            });

        assert!(matches!(result, Err(LaunchError::ExecutablePath(_))));
        assert!(!called.get());
        assert!(process.env.is_empty());
        assert_eq!(runtime.calls, [Call::InitSupport]);
    }

    #[test]
    fn encoding_failure_stops_everything() {
        let mut runtime = FakeRuntime::default();
        let mut process = FakeProcess::at("/opt/app/bin/app");
        let entry = FakeEntry {
            args: Err(2),
            console_prepared: Cell::new(false),
        };

        let result = Launcher::new(&mut runtime, &mut process, image()).launch(&entry, |_, _| 0);

        assert!(matches!(
            result,
            Err(LaunchError::ArgumentEncoding { index: 2 })
        ));
        assert!(!entry.console_prepared.get());
        assert!(runtime.calls.is_empty());
        assert!(process.env.is_empty());
    }

    #[test]
    fn program_without_arguments() {
        let mut runtime = FakeRuntime::default();
        let mut process = FakeProcess::at("/opt/app/bin/app");

        let mut count = usize::MAX;
        Launcher::new(&mut runtime, &mut process, image())
            .launch(&FakeEntry::new(&[]), |runtime, args| {
                count = runtime.list(args).len();
                3
            })
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(runtime.global_string("PROGRAM_FILE"), b"");
    }

    #[test]
    fn missing_args_global_is_fatal() {
        struct NoArgs(FakeRuntime);

        impl Runtime for NoArgs {
            type Value = usize;

            fn init_support(&mut self) {}

            fn initialize(&mut self, _: &ImageFile) -> Result<(), LaunchError> {
                Ok(())
            }

            fn set_raw_args(&mut self, args: &Arguments) -> Result<(), LaunchError> {
                self.0.set_raw_args(args)
            }

            fn global(&mut self, name: &CStr) -> Result<usize, LaunchError> {
                self.0.global(name)
            }

            fn set_global(&mut self, name: &CStr, value: usize) -> Result<(), LaunchError> {
                self.0.set_global(name, value)
            }

            fn make_string(&mut self, bytes: &CStr) -> Result<usize, LaunchError> {
                self.0.make_string(bytes)
            }

            fn append_to_list(&mut self, list: usize, value: usize) -> Result<(), LaunchError> {
                self.0.append_to_list(list, value)
            }

            fn shutdown(&mut self, code: i32) {
                self.0.shutdown(code);
            }
        }

        let mut process = FakeProcess::at("/opt/app/bin/app");
        let result = Launcher::new(NoArgs(FakeRuntime::default()), &mut process, image())
            .launch(&FakeEntry::new(&["app"]), |_, _| 0);

        assert!(matches!(
            result,
            Err(LaunchError::Runtime {
                operation: "global"
            })
        ));
    }
}
