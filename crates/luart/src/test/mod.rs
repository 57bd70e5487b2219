// Test module organization
pub mod test_basic;
pub mod test_math;
pub mod test_metamethods;
pub mod test_package;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::*;

/// Runtime with every library loaded and a fixed random seed
pub(crate) fn new_vm() -> LuaVM {
    let mut vm = LuaVM::new(SafeOption {
        random_seed: Some(42),
        ..SafeOption::default()
    });
    vm.open_stdlib(Stdlib::All).unwrap();
    vm
}

pub(crate) fn s(text: &str) -> LuaValue {
    LuaValue::from(text)
}

pub(crate) fn n(value: f64) -> LuaValue {
    LuaValue::Number(value)
}

/// `lib.name` from the globals (`_G` for base functions)
pub(crate) fn lib_fn(vm: &LuaVM, lib: &str, name: &str) -> LuaValue {
    if lib == "_G" {
        return vm.get_global(name);
    }
    match vm.get_global(lib) {
        LuaValue::Table(t) => t.get_str(name),
        _ => LuaValue::Nil,
    }
}

/// Call `lib.name(args...)`
pub(crate) fn call_lib(
    vm: &mut LuaVM,
    lib: &str,
    name: &str,
    args: Vec<LuaValue>,
) -> LuaResult<Vec<LuaValue>> {
    let func = lib_fn(vm, lib, name);
    Ok(vm.call(&func, MultiValue::from(args))?.all_values())
}

/// Output sink that can be read back after the runtime wrote to it
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
