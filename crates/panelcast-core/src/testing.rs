//! In-memory registry and channel for unit tests

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::channel::{BroadcastChannel, BroadcastListener, BroadcastMessage, Payload};
use crate::surface::{check_index, ResolveError, SurfaceError, SurfaceRegistry, TextSurface};

#[derive(Default)]
pub struct MemoryRegistry {
    /// `None` marks a block without text surfaces
    blocks: HashMap<String, Option<Vec<RefCell<String>>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_panel(mut self, name: &str, surfaces: usize) -> Self {
        let surfaces = (0..surfaces).map(|_| RefCell::new(String::new())).collect();
        self.blocks.insert(name.to_string(), Some(surfaces));
        self
    }

    pub fn with_plain_block(mut self, name: &str) -> Self {
        self.blocks.insert(name.to_string(), None);
        self
    }

    pub fn remove(&mut self, name: &str) {
        self.blocks.remove(name);
    }

    pub fn set_text(&self, name: &str, index: usize, text: &str) {
        if let Some(Some(surfaces)) = self.blocks.get(name) {
            *surfaces[index].borrow_mut() = text.to_string();
        }
    }

    pub fn text(&self, name: &str, index: usize) -> String {
        match self.blocks.get(name) {
            Some(Some(surfaces)) => surfaces[index].borrow().clone(),
            _ => String::new(),
        }
    }
}

struct MemorySurface<'a>(&'a RefCell<String>);

impl TextSurface for MemorySurface<'_> {
    fn read_text(&self) -> Result<String, SurfaceError> {
        Ok(self.0.borrow().clone())
    }

    fn write_text(&self, text: &str, append: bool) -> Result<(), SurfaceError> {
        let mut content = self.0.borrow_mut();
        if !append {
            content.clear();
        }
        content.push_str(text);
        Ok(())
    }
}

impl SurfaceRegistry for MemoryRegistry {
    fn resolve(&self, block: &str, index: i64) -> Result<Box<dyn TextSurface + '_>, ResolveError> {
        let surfaces = match self.blocks.get(block) {
            None => return Err(ResolveError::UnknownBlock(block.to_string())),
            Some(None) => return Err(ResolveError::NotTextSurfaceProvider(block.to_string())),
            Some(Some(surfaces)) => surfaces,
        };
        let i = check_index(block, index, surfaces.len())?;
        Ok(Box::new(MemorySurface(&surfaces[i])))
    }
}

type Queue = Rc<RefCell<VecDeque<BroadcastMessage>>>;

/// Records every send and fans out to registered listeners
#[derive(Default)]
pub struct MemoryChannel {
    listeners: RefCell<HashMap<String, Vec<Queue>>>,
    pub sent: RefCell<Vec<BroadcastMessage>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sends(&self) -> usize {
        self.sent.borrow().len()
    }

    /// Deliver a message to the listeners of `deliver_to`, regardless of its own tag
    pub fn inject(&self, deliver_to: &str, message: BroadcastMessage) {
        if let Some(queues) = self.listeners.borrow().get(deliver_to) {
            for queue in queues {
                queue.borrow_mut().push_back(message.clone());
            }
        }
    }
}

pub struct MemoryListener(Queue);

impl BroadcastListener for MemoryListener {
    fn has_pending(&self) -> bool {
        !self.0.borrow().is_empty()
    }

    fn accept(&mut self) -> Option<BroadcastMessage> {
        self.0.borrow_mut().pop_front()
    }
}

impl BroadcastChannel for MemoryChannel {
    type Listener = MemoryListener;

    fn register_listener(&self, tag: &str) -> MemoryListener {
        let queue = Queue::default();
        self.listeners
            .borrow_mut()
            .entry(tag.to_string())
            .or_default()
            .push(queue.clone());
        MemoryListener(queue)
    }

    fn send(&self, tag: &str, payload: Payload) {
        let message = BroadcastMessage {
            tag: tag.to_string(),
            data: payload,
        };
        self.sent.borrow_mut().push(message.clone());
        self.inject(tag, message);
    }
}
