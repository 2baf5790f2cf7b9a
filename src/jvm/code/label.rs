use crate::jvm::Error;
use std::collections::HashMap;
use std::fmt;

/// Opaque label
///
/// Labels are handles into the [`LabelTable`] of the method body that created them, so they must
/// not be used across methods.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct Label(usize);

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

#[derive(Debug)]
struct LabelSlot {
    /// Name used in source (anonymous labels have none)
    name: Option<String>,

    /// Has the label been placed in the instruction stream?
    placed: bool,

    /// Bytecode offset, known only after layout
    offset: Option<usize>,
}

/// Labels of a single method body
#[derive(Debug, Default)]
pub struct LabelTable {
    names: HashMap<String, Label>,
    slots: Vec<LabelSlot>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable::default()
    }

    /// Get the label with the given name, creating it if this is the first mention
    pub fn label(&mut self, name: &str) -> Label {
        if let Some(label) = self.names.get(name) {
            return *label;
        }
        let label = self.push(Some(name.to_owned()));
        self.names.insert(name.to_owned(), label);
        label
    }

    /// Make a fresh label which can't be referred to by name
    pub fn fresh(&mut self) -> Label {
        self.push(None)
    }

    fn push(&mut self, name: Option<String>) -> Label {
        let label = Label(self.slots.len());
        self.slots.push(LabelSlot {
            name,
            placed: false,
            offset: None,
        });
        label
    }

    /// Name of a label, for error messages
    pub fn name(&self, label: Label) -> String {
        match &self.slots[label.0].name {
            Some(name) => name.clone(),
            None => format!("{:?}", label),
        }
    }

    /// Mark a label as placed
    pub fn place(&mut self, label: Label) -> Result<(), Error> {
        if self.slots[label.0].placed {
            let msg = format!("duplicate label '{}'", self.name(label));
            return Err(Error::structural(msg));
        }
        self.slots[label.0].placed = true;
        Ok(())
    }

    pub fn is_placed(&self, label: Label) -> bool {
        self.slots[label.0].placed
    }

    /// Names of all labels that were mentioned but never placed
    pub fn unplaced(&self) -> Vec<String> {
        (0..self.slots.len())
            .map(Label)
            .filter(|label| !self.is_placed(*label))
            .map(|label| self.name(label))
            .collect()
    }

    pub(crate) fn set_offset(&mut self, label: Label, offset: usize) {
        self.slots[label.0].offset = Some(offset);
    }

    /// Offset of a label in the code array (only available after layout)
    pub fn offset(&self, label: Label) -> Result<usize, Error> {
        match self.slots[label.0].offset {
            Some(offset) => Ok(offset),
            None if !self.slots[label.0].placed => {
                let msg = format!("undefined label '{}'", self.name(label));
                Err(Error::structural(msg))
            }
            None => {
                let msg = format!("offset of label '{}' requested before layout", self.name(label));
                Err(Error::internal(msg))
            }
        }
    }

    /// Is the label name purely numeric?
    ///
    /// Numeric labels denote an offset that already exists at the point where they are written,
    /// so they get attached before (not after) the instruction currently being assembled.
    pub fn is_numeric(name: &str) -> bool {
        !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_are_interned_by_name() {
        let mut labels = LabelTable::new();
        let a = labels.label("a");
        let b = labels.label("b");
        assert_ne!(a, b);
        assert_eq!(labels.label("a"), a);
        assert_ne!(labels.fresh(), a);
    }

    #[test]
    fn placing_twice_is_an_error() {
        let mut labels = LabelTable::new();
        let a = labels.label("loop");
        labels.place(a).unwrap();
        let err = labels.place(a).unwrap_err();
        assert!(err.to_string().contains("duplicate label 'loop'"));
    }

    #[test]
    fn unplaced_labels_are_reported() {
        let mut labels = LabelTable::new();
        let a = labels.label("a");
        labels.label("b");
        labels.place(a).unwrap();
        assert_eq!(labels.unplaced(), vec!["b".to_owned()]);
        assert!(labels.offset(a).unwrap_err().is_internal());

        labels.set_offset(a, 4);
        assert_eq!(labels.offset(a).unwrap(), 4);
    }

    #[test]
    fn numeric_labels() {
        assert!(LabelTable::is_numeric("12"));
        assert!(!LabelTable::is_numeric("L12"));
        assert!(!LabelTable::is_numeric(""));
    }
}
