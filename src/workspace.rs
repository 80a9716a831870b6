use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::fmt::{Debug, Formatter};
use thread_local::ThreadLocal;

/// A workspace that contains type-erased objects.
///
/// The workspace is intended to hold the per-element scratch tiles of the kernels.
/// It is optimized particularly for the case where the same type is accessed many times in a row.
#[derive(Debug, Default)]
pub struct Workspace {
    workspaces: Vec<Box<dyn Any + Send>>,
}

impl Workspace {
    pub fn get_or_insert_with<W, F>(&mut self, create: F) -> &mut W
    where
        W: 'static + Send,
        F: FnOnce() -> W,
    {
        // Note: We treat the Vec as a stack, so we search from the end of the vector.
        let existing_ws_idx = self.workspaces.iter().rposition(|ws| ws.is::<W>());
        let idx = match existing_ws_idx {
            Some(idx) => idx,
            None => {
                let w = create();
                self.workspaces.push(Box::new(w) as Box<dyn Any + Send>);
                self.workspaces.len() - 1
            }
        };

        // The same scratch type is typically requested for every element of a batch,
        // so keep the most recent one at the top of the stack
        let last = self.workspaces.len() - 1;
        self.workspaces.swap(idx, last);

        let entry = &mut self.workspaces[last];
        entry
            .downcast_mut()
            .expect("Internal error: Downcasting can by definition not fail")
    }

    pub fn get_or_default<W>(&mut self) -> &mut W
    where
        W: 'static + Send + Default,
    {
        self.get_or_insert_with(Default::default)
    }
}

/// Per-thread workspaces shared by the element-parallel kernels.
///
/// Each worker thread lazily creates its own [`Workspace`], so scratch tiles are allocated once
/// per thread and reused across elements and kernel invocations.
#[derive(Default)]
pub struct KernelScratch {
    local: ThreadLocal<RefCell<Workspace>>,
}

impl Debug for KernelScratch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelScratch").finish_non_exhaustive()
    }
}

impl KernelScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with this thread's instance of the scratch type `W`.
    pub fn with<W, R>(&self, f: impl FnOnce(&mut W) -> R) -> R
    where
        W: 'static + Send + Default,
    {
        let mut workspace = self.local.get_or_default().borrow_mut();
        f(workspace.get_or_default())
    }
}

/// Resizes `buffer` to `len` entries and returns them as a slice.
///
/// The contents are unspecified; kernels initialize every tile they read.
#[inline]
pub(crate) fn tile(buffer: &mut Vec<f64>, len: usize) -> &mut [f64] {
    if buffer.len() < len {
        buffer.resize(len, 0.0);
    }
    &mut buffer[..len]
}
