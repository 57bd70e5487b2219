use crate::lib_registry::check_table;
use crate::lua_value::{CallOutcome, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

/// table.sort(list [, comp]) - Sort the array part in place.
///
/// Merge sort over a copy of the items: a comparator that errors aborts
/// the sort and leaves the table untouched, and an inconsistent
/// comparator only yields an unspecified order.
pub fn table_sort(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "sort")?;
    let comp = args.arg(2);
    if !comp.is_nil() && !comp.is_function() {
        return Err(LuaError::Type(format!(
            "bad argument #2 to 'sort' (function expected, got {})",
            comp.type_name()
        )));
    }

    let items = table.borrow_mut().array_items().to_vec();
    if items.len() <= 1 {
        return Ok(CallOutcome::none());
    }
    let sorted = merge_sort(vm, items, &comp)?;
    table.borrow_mut().array_replace(sorted);
    Ok(CallOutcome::none())
}

fn sort_less(vm: &mut LuaVM, a: &LuaValue, b: &LuaValue, comp: &LuaValue) -> LuaResult<bool> {
    if comp.is_nil() {
        return vm.less_than(a, b);
    }
    Ok(vm
        .call1(comp, MultiValue::two(a.clone(), b.clone()))?
        .is_truthy())
}

/// Bottom-up merge sort; stable
fn merge_sort(
    vm: &mut LuaVM,
    items: Vec<LuaValue>,
    comp: &LuaValue,
) -> LuaResult<Vec<LuaValue>> {
    let n = items.len();
    let mut src = items;
    let mut width = 1;
    while width < n {
        let mut dst = Vec::with_capacity(n);
        for start in (0..n).step_by(2 * width) {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j) = (start, mid);
            while i < mid && j < end {
                if sort_less(vm, &src[j], &src[i], comp)? {
                    dst.push(src[j].clone());
                    j += 1;
                } else {
                    dst.push(src[i].clone());
                    i += 1;
                }
            }
            dst.extend_from_slice(&src[i..mid]);
            dst.extend_from_slice(&src[j..end]);
        }
        src = dst;
        width *= 2;
    }
    Ok(src)
}
