#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use undo_history::{UndoConfig, UndoManager, Undoable};

#[derive(Debug, Arbitrary)]
enum Op {
    Add(i8),
    Dynamic(i8),
    Undo,
    Redo,
    Begin,
    End,
    Cancel,
    Disable,
    Enable,
    SetLevels(u8),
    Reset,
}

fn shift(counter: Arc<AtomicI64>, amount: i64) -> Undoable {
    Undoable::new("shift", move || {
        counter.fetch_sub(amount, Ordering::Relaxed);
        shift(counter, -amount)
    })
}

fuzz_target!(|input: (u8, Vec<Op>)| {
    let (levels, ops) = input;
    let counter = Arc::new(AtomicI64::new(0));
    let mut mgr = UndoManager::new(UndoConfig::new(usize::from(levels % 16)));

    for op in ops.iter().take(512) {
        match op {
            Op::Add(k) => {
                let k = i64::from(*k);
                let (fwd, bwd) = (counter.clone(), counter.clone());
                let _ = mgr.perform_change(
                    "add",
                    move || {
                        fwd.fetch_add(k, Ordering::Relaxed);
                    },
                    move || {
                        bwd.fetch_sub(k, Ordering::Relaxed);
                    },
                );
            }
            Op::Dynamic(k) => {
                let k = i64::from(*k);
                counter.fetch_add(k, Ordering::Relaxed);
                let _ = mgr.register_undoable(shift(counter.clone(), k));
            }
            Op::Undo => {
                let _ = mgr.undo();
            }
            Op::Redo => {
                let _ = mgr.redo();
            }
            Op::Begin => {
                let _ = mgr.begin_group("group");
            }
            Op::End => {
                let _ = mgr.end_group();
            }
            Op::Cancel => {
                let _ = mgr.cancel_group();
            }
            Op::Disable => mgr.disable_registration(),
            Op::Enable => {
                let _ = mgr.enable_registration();
            }
            Op::SetLevels(n) => mgr.set_levels_of_undo(usize::from(*n % 16)),
            Op::Reset => mgr.reset(),
        }

        // Post-conditions that must always hold:
        let index = mgr.state_index();
        assert!(index >= -1, "state_index below -1");
        assert!(index < mgr.len() as isize, "state_index past end");
        assert_eq!(mgr.can_undo(), index >= 0);
        assert_eq!(mgr.undo_depth() + mgr.redo_depth(), mgr.len());
        assert!(!mgr.is_undoing() && !mgr.is_redoing(), "replay flag leaked");
    }

    // Every committed entry must replay cleanly in both directions.
    while mgr.grouping_level() > 0 {
        mgr.end_group().expect("open group closes");
    }
    let undone = mgr.undo_depth();
    for _ in 0..undone {
        mgr.undo().expect("committed entry undoes");
    }
    for _ in 0..undone {
        mgr.redo().expect("undone entry redoes");
    }
});
