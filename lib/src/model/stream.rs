use super::Instruction;
use std::fmt;
use std::iter::FromIterator;

/// Opaque identity of an instruction inside an [`InstructionStream`]
///
/// Labels survive insertions: the index of an instruction is only ever computed on demand from
/// its label.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(usize);

impl Label {
    /// Label of the first instruction ever added to a stream
    pub const START: Label = Label(0);

    /// Label that never resolves to an instruction
    ///
    /// Branches pointing past the end of a method body end up targetting this.
    pub const UNRESOLVED: Label = Label(usize::MAX);

    /// Get the next fresh label
    pub fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Label::UNRESOLVED {
            formatter.write_str("l?")
        } else {
            formatter.write_fmt(format_args!("l{}", self.0))
        }
    }
}

/// Generates new labels
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct LabelGenerator(Label);

impl LabelGenerator {
    pub fn new(start: Label) -> LabelGenerator {
        LabelGenerator(start)
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

/// Ordered, mutable method body
#[derive(Clone, Debug)]
pub struct InstructionStream {
    entries: Vec<(Label, Instruction)>,
    label_generator: LabelGenerator,
}

impl InstructionStream {
    pub fn new() -> InstructionStream {
        InstructionStream {
            entries: vec![],
            label_generator: LabelGenerator::new(Label::START),
        }
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an instruction to the end
    pub fn push(&mut self, insn: Instruction) -> Label {
        let label = self.label_generator.fresh_label();
        self.entries.push((label, insn));
        label
    }

    /// Insert an instruction at `index`, shifting everything from `index` onwards right by one
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, insn: Instruction) -> Label {
        let label = self.label_generator.fresh_label();
        self.entries.insert(index, (label, insn));
        label
    }

    /// Label of the instruction currently at `index`
    pub fn label_at(&self, index: usize) -> Option<Label> {
        self.entries.get(index).map(|(label, _)| *label)
    }

    /// Current index of the instruction with this label
    pub fn index_of(&self, label: Label) -> Option<usize> {
        self.entries.iter().position(|(lbl, _)| *lbl == label)
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.entries.get(index).map(|(_, insn)| insn)
    }

    /// Iterate through labelled instructions in order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Label, &Instruction)> {
        self.entries.iter().map(|(label, insn)| (*label, insn))
    }

    pub fn instructions(&self) -> impl DoubleEndedIterator<Item = &Instruction> {
        self.entries.iter().map(|(_, insn)| insn)
    }
}

impl Default for InstructionStream {
    fn default() -> InstructionStream {
        InstructionStream::new()
    }
}

impl FromIterator<Instruction> for InstructionStream {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> InstructionStream {
        let mut stream = InstructionStream::new();
        for insn in iter {
            stream.push(insn);
        }
        stream
    }
}

impl fmt::Display for InstructionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (label, insn)) in self.entries.iter().enumerate() {
            writeln!(f, "IL_{:04} {:?}: {}", index, label, insn)?;
        }
        Ok(())
    }
}
