//! # Aborting a running chain
//!
//! Demonstrates:
//! - `abort()` on a running abortable stream
//! - Abortion branches and a skipped attached continuation
//! - Adopted sub-work aborted together with its parent
//! - Deterministic driving with `ManualScheduler`
//!
//! Run with: `cargo run --example abort_recovery`

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use flowvisor::{
    ExecFn, Executable, Execution, Handle, ManualScheduler, MapFn, Payload, Provider, StreamType,
};

type HandleSlot = Rc<RefCell<Option<Handle>>>;

/// Starts, then waits for someone to close it through the stored handle.
fn long_running(name: &'static str, slot: &HandleSlot) -> impl Executable {
    let slot = slot.clone();
    ExecFn::new(move |h, _| {
        println!("  {name}: started");
        *slot.borrow_mut() = Some(h.clone());
        Ok(Execution::Pending)
    })
}

fn note(message: &'static str) -> impl Executable {
    MapFn::new(move |p: Payload| {
        println!("  {message}");
        Ok(p)
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let scheduler = Rc::new(ManualScheduler::new());
    let provider = Provider::new(scheduler.clone());

    let worker_handle = HandleSlot::default();
    let upload_handle = HandleSlot::default();

    let worker = provider.create(long_running("chunk worker", &worker_handle), StreamType::Abortable);
    worker.abortion(note("chunk worker: abortion branch ran"))?;

    let w = worker.clone();
    let slot = upload_handle.clone();
    let upload = provider.create(
        ExecFn::new(move |h, _| {
            println!("  upload: started, adopting chunk worker");
            h.adopt(Some(&w))?;
            *slot.borrow_mut() = Some(h.clone());
            Ok(Execution::Pending)
        }),
        StreamType::Abortable,
    );
    upload.attach(note("verify: runs only after a clean close"))?;
    upload.abortion(note("upload: abortion branch ran"))?;

    scheduler.run_until_idle();
    println!("running: upload={:?} worker={:?}", upload.state(), worker.state());

    upload.abort();
    println!("aborted: upload={:?} worker={:?}", upload.state(), worker.state());

    // Both units notice the abort and finish early; the worker first, since the
    // upload's death eliminates whatever it adopted.
    for (name, slot) in [("chunk worker", &worker_handle), ("upload", &upload_handle)] {
        if let Some(h) = slot.borrow().as_ref() {
            println!("  {name}: is_aborted={}, closing", h.is_aborted());
            h.close(Payload::Empty);
        }
        scheduler.run_until_idle();
    }
    scheduler.run_all();

    println!("final:   upload={:?} worker={:?}", upload.state(), worker.state());
    drop((upload, worker));
    scheduler.run_all();
    println!(
        "created={} existing={} active={}",
        provider.total_created(),
        provider.total_existing(),
        provider.total_active()
    );
    Ok(())
}
