//! Intrusive doubly-linked circular list.
//!
//! A [`ListNode`] is meant to be embedded inside a larger struct (a `Proc`,
//! a `WaitData`) rather than allocated on its own. Recovering the owning
//! struct from a node pointer is done with [`container_of`], the same trick
//! the C original uses via its `container_of` macro.
//!
//! An empty list is a node whose `prev`/`next` both point back to itself;
//! there is no separate sentinel type.

use core::ptr;

/// A node in an intrusive circular doubly-linked list.
#[repr(C)]
pub struct ListNode {
    pub prev: *mut ListNode,
    pub next: *mut ListNode,
}

impl ListNode {
    /// An uninitialized node. Callers must call [`ListNode::init`] (or
    /// [`init_list_node`]) before the node is linked into anything.
    pub const fn uninit() -> ListNode {
        ListNode {
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Makes `self` a one-element circular list.
    ///
    /// # Safety
    /// `self` must be a valid, pinned location for the lifetime the node
    /// spends linked into a list.
    pub unsafe fn init(node: *mut ListNode) {
        init_list_node(node);
    }
}

/// Makes `node` point to itself in both directions.
///
/// # Safety
/// `node` must be dereferenceable.
pub unsafe fn init_list_node(node: *mut ListNode) {
    (*node).prev = node;
    (*node).next = node;
}

/// Splices two circular lists together into one, returning a pointer that
/// is part of the merged list (or whichever argument is non-null, if the
/// other is null).
///
/// # Safety
/// `node1` and `node2`, if non-null, must each be a valid node belonging to
/// a (possibly one-element) circular list.
pub unsafe fn merge_list(node1: *mut ListNode, node2: *mut ListNode) -> *mut ListNode {
    if node1.is_null() {
        return node2;
    }
    if node2.is_null() {
        return node1;
    }

    let node3 = (*node1).next;
    let node4 = (*node2).prev;

    (*node1).next = node2;
    (*node2).prev = node1;
    (*node4).next = node3;
    (*node3).prev = node4;

    node1
}

/// Inserts a freshly-initialized `node` into `list` (which may be null,
/// meaning "no list yet"). Returns a pointer valid for the resulting list.
///
/// # Safety
/// `node` must be dereferenceable and not already linked into any list.
/// `list`, if non-null, must be a valid node.
pub unsafe fn insert_into_list(list: *mut ListNode, node: *mut ListNode) -> *mut ListNode {
    init_list_node(node);
    merge_list(list, node)
}

/// Removes `node` from whatever list it is part of, leaving it as a
/// one-element list of itself. Returns a remaining pointer into the list
/// `node` used to belong to, or null if `node` was the list's only member.
///
/// # Safety
/// `node` must be dereferenceable and currently linked (possibly to itself).
pub unsafe fn detach_from_list(node: *mut ListNode) -> *mut ListNode {
    let prev = (*node).prev;
    let next = (*node).next;

    (*prev).next = next;
    (*next).prev = prev;
    init_list_node(node);

    if prev == node {
        ptr::null_mut()
    } else {
        prev
    }
}

/// Whether `list` is a one-element list of itself (i.e. "empty").
///
/// # Safety
/// `list` must be dereferenceable.
pub unsafe fn empty_list(list: *const ListNode) -> bool {
    (*list).next == list as *mut ListNode
}

/// Recovers a pointer to the struct containing `$node`, where `$node` is a
/// pointer to the `$field` member of a `$ty`.
#[macro_export]
macro_rules! container_of {
    ($node:expr, $ty:ty, $field:ident) => {{
        let node_ptr = $node as *mut $crate::list::ListNode as usize;
        let offset = core::mem::offset_of!($ty, $field);
        (node_ptr - offset) as *mut $ty
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn collect(list: *mut ListNode) -> alloc_free_vec::Fixed {
        let mut out = alloc_free_vec::Fixed::new();
        if empty_list(list) {
            return out;
        }
        let mut n = (*list).next;
        loop {
            out.push(n as usize);
            n = (*n).next;
            if n == list {
                break;
            }
        }
        out
    }

    // A tiny fixed-capacity collector so these tests don't need `alloc`.
    mod alloc_free_vec {
        pub struct Fixed {
            buf: [usize; 8],
            len: usize,
        }
        impl Fixed {
            pub fn new() -> Self {
                Fixed { buf: [0; 8], len: 0 }
            }
            pub fn push(&mut self, v: usize) {
                self.buf[self.len] = v;
                self.len += 1;
            }
            pub fn as_slice(&self) -> &[usize] {
                &self.buf[..self.len]
            }
        }
    }

    #[test]
    fn fresh_node_is_empty_list() {
        let mut n = ListNode::uninit();
        unsafe {
            init_list_node(&mut n);
            assert!(empty_list(&n));
        }
    }

    #[test]
    fn insert_and_detach_round_trip() {
        let mut head = ListNode::uninit();
        let mut a = ListNode::uninit();
        let mut b = ListNode::uninit();
        unsafe {
            init_list_node(&mut head);
            let head_ptr = &mut head as *mut ListNode;
            insert_into_list(head_ptr, &mut a);
            insert_into_list(head_ptr, &mut b);

            assert!(!empty_list(head_ptr));
            let seen = collect(head_ptr);
            assert_eq!(seen.as_slice().len(), 2);

            detach_from_list(&mut a);
            detach_from_list(&mut b);
            assert!(empty_list(head_ptr));
            assert!(empty_list(&a));
            assert!(empty_list(&b));
        }
    }

    #[test]
    fn detach_last_node_returns_null() {
        let mut head = ListNode::uninit();
        let mut a = ListNode::uninit();
        unsafe {
            init_list_node(&mut head);
            insert_into_list(&mut head, &mut a);
            let rest = detach_from_list(&mut a);
            assert!(rest.is_null());
        }
    }
}
