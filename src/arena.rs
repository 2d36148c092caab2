//! Block-allocated stack of open-element parsing frames.
//!
//! The dispatcher keeps one frame per open element, so stack depth tracks
//! document nesting. Frames live in a chain of fixed-capacity blocks:
//! `push` fills the current block and moves to (or allocates) the next one
//! when it is full, `pop` regresses across a block boundary when a block
//! empties. Emptied blocks keep their storage until the whole stack is
//! dropped at the end of the parse, so deep nesting amortizes to one
//! allocation per `STACK_BLOCK_SIZE` frames.

const STACK_BLOCK_SIZE: usize = 100;

pub(crate) struct FrameStack<T> {
    blocks: Vec<Vec<T>>,
    current: usize,
    len: usize,
}

impl<T> FrameStack<T> {
    pub(crate) fn new() -> Self {
        FrameStack {
            blocks: vec![Vec::with_capacity(STACK_BLOCK_SIZE)],
            current: 0,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn push(&mut self, frame: T) {
        if self.blocks[self.current].len() == STACK_BLOCK_SIZE {
            self.current += 1;
            if self.current == self.blocks.len() {
                self.blocks.push(Vec::with_capacity(STACK_BLOCK_SIZE));
            }
        }
        self.blocks[self.current].push(frame);
        self.len += 1;
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut T> {
        if self.len == 0 {
            return None;
        }
        self.blocks[self.current].last_mut()
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let frame = self.blocks[self.current].pop();
        debug_assert!(frame.is_some());
        if self.blocks[self.current].is_empty() && self.current > 0 {
            self.current -= 1;
        }
        self.len -= 1;
        frame
    }
}
