//! Global dead-code elimination.
//!
//! Removes functions that have a body, are not entry points, and are never
//! referenced. Removing one function can orphan another, so this runs to a
//! fixed point.

use jcc_tir::module::Module;
use log::debug;

/// Runs global DCE over the module. Returns the number of functions
/// removed.
pub fn global_dce(module: &mut Module) -> usize {
    let mut removed = 0;
    loop {
        let dead: Vec<_> = module
            .functions()
            .into_iter()
            .filter(|&f| {
                module.func_has_body(f)
                    && module.value(f).name.as_deref() != Some("main")
                    && module.value(f).uses().is_empty()
            })
            .collect();
        if dead.is_empty() {
            break;
        }
        for func in dead {
            debug!("removing dead function @{}", module.value(func).name.as_deref().unwrap_or("?"));
            for block in module.func_blocks(func) {
                for inst in module.block_insts(block) {
                    module.unlink_inst(inst);
                    module.drop_operands(inst);
                }
                module.erase_block(block);
            }
            // Dropping the argument edges releases references the function
            // itself held.
            module.drop_operands(func);
            module.remove_global(func);
            removed += 1;
        }
    }
    removed
}
