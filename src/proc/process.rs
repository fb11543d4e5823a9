//! Process Control Block and process-tree operations (component G).

use super::context::{KernelContext, UserContext};
use super::scheduler;
use crate::container_of;
use crate::list::{self, ListNode};
use crate::mem::page;
use crate::param::{FIRST_PID, PAGE_SIZE};
use crate::sync::semaphore::Semaphore;
use crate::sync::spinlock::Spinlock;
use alloc::boxed::Box;
use core::ptr::{addr_of_mut, null_mut};
use core::sync::atomic::{AtomicI32, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub enum ProcessState {
    Unused,
    Runnable,
    Running,
    Sleeping,
    Zombie,
}

/// Process Control Block.
///
/// `children`/`ptnode` together form the process tree: `children` is the
/// head of a circular list of this process's direct children, and each
/// child is linked into its parent's `children` list through its own
/// `ptnode`. The root process is its own parent.
#[repr(C)]
pub struct Process {
    pub killed: bool,
    /// Set on the NCPU idle processes created at boot; an idle process is
    /// never scheduled by `pick_next` and never appears in the run queue.
    pub idle: bool,
    pub pid: i32,
    pub exitcode: i32,
    pub state: ProcessState,
    pub childexit: Semaphore,
    pub children: ListNode,
    pub ptnode: ListNode,
    pub parent: *mut Process,
    /// Scheduling-queue link (the C original's `schinfo.sched_node`).
    pub sched_node: ListNode,
    /// Base of the one-page kernel stack backing `kcontext`.
    pub kstack: *mut u8,
    pub ucontext: *mut UserContext,
    pub kcontext: *mut KernelContext,
    /// Short debugging name, NUL-padded. Purely observational: nothing in
    /// the core reads it back. There is no `exec` to populate it from an
    /// argv in this spec, so callers that care set it with [`Process::set_name`].
    pub name: [u8; 16],
}

impl Process {
    /// Overwrites the debug name, truncating to 15 bytes plus a NUL.
    pub fn set_name(&mut self, name: &[u8]) {
        let n = name.len().min(self.name.len() - 1);
        self.name = [0u8; 16];
        self.name[..n].copy_from_slice(&name[..n]);
    }

    pub fn name(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        &self.name[..end]
    }
}

pub(crate) static PROC_LOCK: Spinlock = Spinlock::new();
static NEXT_PID: AtomicI32 = AtomicI32::new(FIRST_PID);

static mut ROOT_PROC: Process = Process {
    killed: false,
    idle: false,
    pid: 0,
    exitcode: 0,
    state: ProcessState::Unused,
    childexit: Semaphore::new(0),
    children: ListNode::uninit(),
    ptnode: ListNode::uninit(),
    parent: null_mut(),
    sched_node: ListNode::uninit(),
    kstack: null_mut(),
    ucontext: null_mut(),
    kcontext: null_mut(),
    name: [0u8; 16],
};

pub fn root() -> *mut Process {
    unsafe { addr_of_mut!(ROOT_PROC) }
}

/// Entry point run on the root process, and on every freshly started
/// process, before jumping into its real entry function.
pub type EntryFn = extern "C" fn(u64) -> !;

/// Brings up the process tree: the root process plus one idle process
/// per CPU, matching the C original's `init_kproc`.
///
/// # Safety
/// Must be called exactly once, early in boot, before any scheduling.
pub unsafe fn init_kproc(kernel_entry: EntryFn) {
    init_proc(root());
    (*root()).parent = root();
    (*root()).set_name(b"root");
    start_proc(root(), kernel_entry, 123456);

    for id in 0..crate::param::NCPU {
        let idle = create_proc();
        (*idle).idle = true;
        (*idle).state = ProcessState::Running;
        (*idle).set_name(b"idle");
        let cpu = &mut *addr_of_mut!(crate::proc::cpu::CPUS[id]);
        cpu.idle = idle;
        cpu.current = idle;
        crate::println!("proc: cpu {} idle is pid {}", id, (*idle).pid);
    }
}

/// Resets `p` to a freshly-allocated, unused-but-initialized state:
/// new pid, empty child list, a fresh kernel stack, and a `childexit`
/// semaphore starting at zero.
///
/// # Safety
/// `p` must be a valid, exclusively-owned location.
pub unsafe fn init_proc(p: *mut Process) {
    let _guard = PROC_LOCK.lock();

    (*p).killed = false;
    (*p).idle = false;
    (*p).pid = NEXT_PID.fetch_add(1, Ordering::Relaxed);
    (*p).exitcode = 0;
    (*p).state = ProcessState::Unused;
    (*p).childexit = Semaphore::new(0);
    list::init_list_node(&mut (*p).children);
    list::init_list_node(&mut (*p).ptnode);
    (*p).parent = null_mut();
    list::init_list_node(&mut (*p).sched_node);

    let stack = page::alloc_page();
    if stack.is_null() {
        panic!("init_proc: out of memory for kernel stack");
    }
    (*p).kstack = stack;
    let kcontext =
        stack.add(PAGE_SIZE - core::mem::size_of::<KernelContext>()) as *mut KernelContext;
    core::ptr::write(kcontext, KernelContext::new());
    (*p).kcontext = kcontext;
    (*p).ucontext = null_mut();
}

/// Allocates a new `Process` from the kernel heap and initializes it.
pub fn create_proc() -> *mut Process {
    let boxed = Box::new(Process {
        killed: false,
        idle: false,
        pid: 0,
        exitcode: 0,
        state: ProcessState::Unused,
        childexit: Semaphore::new(0),
        children: ListNode::uninit(),
        ptnode: ListNode::uninit(),
        parent: null_mut(),
        sched_node: ListNode::uninit(),
        kstack: null_mut(),
        ucontext: null_mut(),
        kcontext: null_mut(),
        name: [0u8; 16],
    });
    let p = Box::into_raw(boxed);
    unsafe {
        init_proc(p);
    }
    p
}

/// Adopts `p` as a child of the currently running process.
///
/// # Safety
/// `p` must not already have a parent.
pub unsafe fn set_parent_to_this(p: *mut Process) {
    let this = scheduler::thisproc();
    let _guard = PROC_LOCK.lock();
    (*p).parent = this;
    list::insert_into_list(&mut (*this).children, &mut (*p).ptnode);
}

/// Sets up `p` to begin executing `entry(arg)` and makes it runnable.
/// Returns `p`'s pid.
///
/// # Safety
/// `p` must have been produced by [`init_proc`]/[`create_proc`] and not
/// yet started.
pub unsafe fn start_proc(p: *mut Process, entry: EntryFn, arg: u64) -> i32 {
    if (*p).parent.is_null() {
        set_parent_to_this(p);
    }

    let kcontext = (*p).kcontext;
    (*kcontext).x0 = entry as usize as u64;
    (*kcontext).x1 = arg;
    (*kcontext).x30 = scheduler::proc_entry as usize as u64;

    let pid = (*p).pid;
    scheduler::activate(p);
    pid
}

/// Blocks until one of the calling process's children exits, reaps it,
/// and returns `(pid, exitcode)`. Returns `None` if the caller has no
/// children at all.
pub fn wait() -> Option<(i32, i32)> {
    let this = scheduler::thisproc();
    loop {
        unsafe {
            let guard = PROC_LOCK.lock();
            if list::empty_list(&(*this).children) {
                drop(guard);
                return None;
            }

            // Scan for a zombie child.
            let mut node = (*this).children.next;
            loop {
                let child = container_of!(node, Process, ptnode);
                scheduler::acquire_sched_lock();
                let is_zombie = (*child).state == ProcessState::Zombie;
                scheduler::release_sched_lock();
                if is_zombie {
                    list::detach_from_list(&mut (*child).ptnode);
                    let pid = (*child).pid;
                    let exitcode = (*child).exitcode;
                    let kstack = (*child).kstack;
                    drop(guard);

                    page::free_page(kstack);
                    drop(Box::from_raw(child));

                    crate::println!("proc: reaped pid {} (exitcode {})", pid, exitcode);
                    return Some((pid, exitcode));
                }
                node = (*node).next;
                if node == &mut (*this).children as *mut ListNode {
                    break;
                }
            }
            drop(guard);
        }

        unsafe {
            (*this).childexit.acquire();
        }
    }
}

/// Terminates the calling process with `code`, reparenting its children
/// to the root process and never returning.
///
/// Panics if called on the root process: the root process is the
/// ancestor of everything and has nowhere to be reparented to.
pub fn exit(code: i32) -> ! {
    let this = scheduler::thisproc();
    unsafe {
        if this == root() {
            panic!("root process exited");
        }

        {
            let _guard = PROC_LOCK.lock();
            while !list::empty_list(&(*this).children) {
                let node = (*this).children.next;
                let child = container_of!(node, Process, ptnode);
                list::detach_from_list(&mut (*child).ptnode);
                (*child).parent = root();
                list::insert_into_list(&mut (*root()).children, &mut (*child).ptnode);
                if (*child).state == ProcessState::Zombie {
                    (*root()).childexit.post();
                }
            }

            (*this).exitcode = code;
        }

        crate::println!("proc: pid {} exiting with code {}", (*this).pid, code);
        (*(*this).parent).childexit.post();

        scheduler::acquire_sched_lock();
        scheduler::sched(ProcessState::Zombie);
    }
    unreachable!("sched(Zombie) never returns");
}

/// Marks the process with pid `pid` as killed. Returns `true` if a process
/// with that pid was found anywhere in the process tree, `false` otherwise
/// (mapping the stated `0`/`-1` contract onto a bool).
///
/// This is exactly the stated contract and nothing more: whether a sleeping
/// target should be force-woken is left unspecified by the source this was
/// stubbed from, so `kill` does not touch scheduling state at all. The
/// target is responsible for observing `killed` at its own checkpoints.
pub fn kill(pid: i32) -> bool {
    unsafe {
        let guard = PROC_LOCK.lock();
        match find_by_pid(root(), pid) {
            Some(p) => {
                (*p).killed = true;
                drop(guard);
                true
            }
            None => false,
        }
    }
}

/// # Safety
/// Caller must hold `PROC_LOCK`.
unsafe fn find_by_pid(subtree_root: *mut Process, pid: i32) -> Option<*mut Process> {
    if (*subtree_root).pid == pid {
        return Some(subtree_root);
    }
    if list::empty_list(&(*subtree_root).children) {
        return None;
    }
    let mut node = (*subtree_root).children.next;
    loop {
        let child = container_of!(node, Process, ptnode);
        if let Some(found) = find_by_pid(child, pid) {
            return Some(found);
        }
        node = (*node).next;
        if node == &mut (*subtree_root).children as *mut ListNode {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_state_equality() {
        assert_eq!(ProcessState::Runnable, ProcessState::Runnable);
        assert_ne!(ProcessState::Runnable, ProcessState::Zombie);
    }
}
