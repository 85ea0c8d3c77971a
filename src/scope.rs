use std::collections::HashMap;

/// A stack of lexical scopes mapping names to some denotation.
///
/// The first frame is the outermost one and is never popped.
#[derive(Debug)]
pub struct Scope<T> {
    frames: Vec<HashMap<Box<str>, T>>,
}

impl<T> Scope<T> {
    pub fn new() -> Scope<T> {
        Scope {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        assert!(self.frames.len() > 1, "can't pop the outermost scope");
        self.frames.pop();
    }

    /// Binds `name` in the innermost frame. If that frame already binds it,
    /// nothing changes and the existing denotation is returned.
    pub fn define(&mut self, name: &str, denotation: T) -> Result<(), &T> {
        let frame = self.frames.last_mut().expect("at least one frame");
        if frame.contains_key(name) {
            return Err(&frame[name]);
        }
        frame.insert(name.into(), denotation);
        Ok(())
    }

    /// Finds the innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Scope::new()
    }
}
