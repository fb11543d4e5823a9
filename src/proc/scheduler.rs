//! Cooperative SMP scheduler (component H).
//!
//! A single global run queue and a single global scheduler lock serve
//! all NCPU CPUs: only one CPU is ever actually inside `sched` picking a
//! next process at a time, which keeps `pick_next` simple at the cost of
//! some cross-CPU contention under heavy scheduling load. Process state
//! transitions themselves are guarded separately (see `process`'s
//! internal tree lock) so that reading/writing a process's `state` never
//! requires holding the scheduler lock.

use super::cpu::Cpu;
use super::process::{Process, ProcessState, PROC_LOCK};
use crate::arch::cpu::swtch;
use crate::container_of;
use crate::queue::Queue;
use crate::sync::spinlock::Spinlock;
use core::ptr::addr_of_mut;

static SCHED_LOCK: Spinlock = Spinlock::new();
static mut RUN_QUEUE: Queue = Queue::new();

/// Returns the process currently running on this CPU.
///
/// # Safety
/// Interrupts must be disabled, or the caller must otherwise guarantee
/// it won't migrate CPUs mid-call.
pub unsafe fn thisproc() -> *mut Process {
    Cpu::current().current
}

/// # Safety
/// Must be paired with a matching `release_sched_lock`.
pub unsafe fn acquire_sched_lock() {
    SCHED_LOCK.lock_unguarded();
}

/// # Safety
/// Caller must currently hold the scheduler lock.
pub unsafe fn release_sched_lock() {
    SCHED_LOCK.unlock();
}

/// Makes `p` runnable and adds it to the run queue.
///
/// If `p` is already `Running` or `Runnable`, this is a no-op. If `p` is
/// `Sleeping` or `Unused`, it is moved to `Runnable` and pushed onto the
/// run queue. Any other state is a logic error elsewhere in the core.
///
/// # Safety
/// `p` must be dereferenceable and not concurrently freed.
pub unsafe fn activate(p: *mut Process) {
    match (*p).state {
        ProcessState::Running | ProcessState::Runnable => {}
        ProcessState::Sleeping | ProcessState::Unused => {
            {
                let _guard = PROC_LOCK.lock();
                (*p).state = ProcessState::Runnable;
            }
            RUN_QUEUE.push_locked(&mut (*p).sched_node);
        }
        ProcessState::Zombie => {
            panic!("activate: unexpected state Zombie for pid {}", (*p).pid);
        }
    }
}

/// Updates the calling process's state, detaching it from the run queue
/// if it is no longer schedulable.
///
/// # Safety
/// Caller must hold the scheduler lock and must be running on behalf of
/// `thisproc()`.
unsafe fn update_this_state(new_state: ProcessState) {
    let this = thisproc();
    (*this).state = new_state;

    if matches!(new_state, ProcessState::Sleeping | ProcessState::Zombie) {
        RUN_QUEUE.detach_locked(&mut (*this).sched_node);
    }
}

/// Picks the next process to run on this CPU: the first `Runnable`
/// process found scanning the run queue from the front, moved to the
/// back of the queue so later scans are round-robin fair. Falls back to
/// this CPU's idle process if the queue is empty or nothing in it is
/// actually runnable.
///
/// # Safety
/// Caller must hold the scheduler lock.
unsafe fn pick_next() -> *mut Process {
    let guard = RUN_QUEUE.lock.lock();

    if RUN_QUEUE.is_empty() {
        drop(guard);
        return Cpu::current().idle;
    }

    let front = RUN_QUEUE.front();
    let mut node = front;
    loop {
        let next = (*node).next;
        let p = container_of!(node, Process, sched_node);

        if (*p).state == ProcessState::Runnable {
            RUN_QUEUE.detach(node);
            RUN_QUEUE.push(node);
            drop(guard);
            return p;
        }

        if next == front {
            break;
        }
        node = next;
    }
    drop(guard);
    Cpu::current().idle
}

/// # Safety
/// Caller must hold the scheduler lock.
unsafe fn update_this_proc(p: *mut Process) {
    Cpu::current().current = p;
}

/// Transitions the calling process to `new_state`, picks the next
/// process to run, and context-switches into it. Releases the scheduler
/// lock before returning (the release happens on whichever CPU the
/// incoming process next returns through `sched` on, same as the
/// C original).
///
/// # Safety
/// Caller must hold the scheduler lock and the calling process's state
/// must currently be `Running`.
pub unsafe fn sched(new_state: ProcessState) {
    let this = thisproc();
    assert_eq!((*this).state, ProcessState::Running);

    update_this_state(new_state);

    let next = pick_next();
    update_this_proc(next);
    assert_eq!((*next).state, ProcessState::Runnable);
    (*next).state = ProcessState::Running;

    if next != this {
        let old_ctx = addr_of_mut!((*this).kcontext);
        swtch(old_ctx, (*next).kcontext);
    }

    release_sched_lock();
}

/// Voluntarily gives up the CPU, remaining runnable.
pub fn r#yield() {
    unsafe {
        acquire_sched_lock();
        sched(ProcessState::Runnable);
    }
}

/// Trampoline every freshly-started process's `kcontext` returns into:
/// releases the scheduler lock that was held across the `swtch` that
/// brought us here, then falls through into `entry(arg)`.
///
/// # Safety
/// Must only ever be reached via `swtch` restoring a `KernelContext`
/// whose `x0`/`x1` hold `entry`/`arg` and whose `x30` is this function.
#[no_mangle]
pub unsafe extern "C" fn proc_entry(entry: extern "C" fn(u64) -> !, arg: u64) -> ! {
    release_sched_lock();
    entry(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ListNode;

    fn fresh_unused_process() -> Process {
        Process {
            killed: false,
            idle: false,
            pid: 42,
            exitcode: 0,
            state: ProcessState::Unused,
            childexit: crate::sync::semaphore::Semaphore::new(0),
            children: ListNode::uninit(),
            ptnode: ListNode::uninit(),
            parent: core::ptr::null_mut(),
            sched_node: ListNode::uninit(),
            kstack: core::ptr::null_mut(),
            ucontext: core::ptr::null_mut(),
            kcontext: core::ptr::null_mut(),
            name: [0u8; 16],
        }
    }

    #[test]
    fn activate_is_noop_on_already_running() {
        let mut p = fresh_unused_process();
        p.state = ProcessState::Running;
        unsafe {
            activate(&mut p);
        }
        assert_eq!(p.state, ProcessState::Running);
    }

    #[test]
    fn activate_makes_unused_runnable_and_queues_it() {
        unsafe {
            RUN_QUEUE = Queue::new();
        }
        let mut p = fresh_unused_process();
        unsafe {
            crate::list::init_list_node(&mut p.sched_node);
            activate(&mut p);
        }
        assert_eq!(p.state, ProcessState::Runnable);
        unsafe {
            assert!(!RUN_QUEUE.is_empty());
        }
    }
}
