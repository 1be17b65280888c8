use arch::Word;
use indexmap::IndexMap;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Code,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ident {
    /// Address within its segment, assigned during layout
    Label(Segment),
    Equ,
    SizeOf,
}

#[derive(Debug, Clone)]
pub struct Alias {
    pub kind: Ident,
    pub line: usize,
    pub value: Option<Word>,
}

/// Every name the program defines: labels, `EQU` constants and the
/// synthesized `sizeof(name)` entries. Each name is defined once.
#[derive(Debug, Clone, Default)]
pub struct Idents(IndexMap<String, Alias>);

pub fn sizeof_key(name: &str) -> String {
    format!("sizeof({name})")
}

impl Idents {
    pub fn new() -> Self {
        Idents(IndexMap::new())
    }

    pub fn define(
        &mut self,
        name: &str,
        kind: Ident,
        line: usize,
        value: Option<Word>,
    ) -> Result<(), Error> {
        if self.0.contains_key(name) {
            return Err(Error::DuplicateDefinition(name.to_string()));
        }
        self.0.insert(name.to_string(), Alias { kind, line, value });
        Ok(())
    }

    /// Record the current address of a label.
    pub fn set(&mut self, name: &str, value: Word) -> Result<(), Error> {
        match self.0.get_mut(name) {
            Some(alias) => {
                alias.value = Some(value);
                Ok(())
            }
            None => Err(Error::Internal(format!("label `{name}` was never declared"))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.0.get(name)
    }

    pub fn get_val(&self, name: &str) -> Option<Word> {
        self.0.get(name).and_then(|alias| alias.value)
    }

    /// Pull every label of `segment` placed after a removed long-form slot
    /// back by one word per such slot. `removed` holds the slot addresses.
    pub fn shrink_labels(&mut self, segment: Segment, removed: &[Word]) {
        for alias in self.0.values_mut() {
            if alias.kind != Ident::Label(segment) {
                continue;
            }
            if let Some(value) = alias.value {
                let shift = removed.iter().filter(|g| value > **g).count() as Word;
                alias.value = Some(value - shift);
            }
        }
    }
}
