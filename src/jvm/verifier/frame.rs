use super::{CodeOffset, DeclaredType, VerificationType};
use crate::jvm::class_file::{
    Attribute, ConstantIndex, ConstantPool, LegacyFrame, StackMap, StackMapFrame, StackMapTable,
    Version,
};
use crate::jvm::code::LabelTable;
use crate::jvm::{Error, MethodDescriptor};

/// Which stack map attribute gets written for method bodies
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackMapForm {
    /// `StackMap`: every frame spelled out with an absolute offset
    Legacy,

    /// `StackMapTable`: frames are delta-encoded against the previous frame
    Compact,
}

impl StackMapForm {
    pub fn for_version(version: Version) -> StackMapForm {
        if version.uses_stack_map_table() {
            StackMapForm::Compact
        } else {
            StackMapForm::Legacy
        }
    }

    pub fn attribute_name(&self) -> &'static str {
        match self {
            StackMapForm::Legacy => "StackMap",
            StackMapForm::Compact => "StackMapTable",
        }
    }
}

/// Frame as declared by a `.stack` block
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyFrame {
    pub offset: CodeOffset,
    pub locals: Vec<DeclaredType>,
    pub stack: Vec<DeclaredType>,
}

impl VerifyFrame {
    pub fn new(offset: CodeOffset) -> VerifyFrame {
        VerifyFrame {
            offset,
            locals: vec![],
            stack: vec![],
        }
    }

    /// Set a local, padding any skipped locals with `Top`
    pub fn set_local(&mut self, index: usize, typ: DeclaredType) {
        if self.locals.len() <= index {
            self.locals.resize(index + 1, VerificationType::Top);
        }
        self.locals[index] = typ;
    }

    pub fn push_local(&mut self, typ: DeclaredType) {
        self.locals.push(typ);
    }

    pub fn push_stack(&mut self, typ: DeclaredType) {
        self.stack.push(typ);
    }

    /// Prefix the locals with the first `count` locals of `previous`
    pub fn copy_locals_from(&mut self, previous: &[DeclaredType], count: usize) -> Result<(), Error> {
        if count > previous.len() {
            let msg = format!(
                "cannot use {} locals from a previous frame that only has {}",
                count,
                previous.len()
            );
            return Err(Error::structural(msg));
        }
        let mut locals = previous[..count].to_vec();
        locals.append(&mut self.locals);
        self.locals = locals;
        Ok(())
    }

    /// Class names this frame mentions (they must be in the constant pool)
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.locals
            .iter()
            .chain(self.stack.iter())
            .filter_map(|typ| match typ {
                VerificationType::Object(cls) => Some(cls.as_str()),
                _ => None,
            })
    }
}

/// Locals on entry to a method, as implied by its descriptor
///
/// The receiver of a constructor is `UninitializedThis` until the super constructor is called,
/// except in `java/lang/Object` which has no super constructor to call.
pub fn initial_locals(
    this_class: &str,
    method_name: &str,
    descriptor: &MethodDescriptor,
    is_static: bool,
) -> Vec<DeclaredType> {
    let mut locals = vec![];
    if !is_static {
        if method_name == "<init>" && this_class != "java/lang/Object" {
            locals.push(VerificationType::UninitializedThis);
        } else {
            locals.push(VerificationType::Object(this_class.to_owned()));
        }
    }
    locals.extend(descriptor.parameters.iter().map(DeclaredType::from));
    locals
}

/// Encode the frames of a method into its stack map attribute
///
/// Must be called after layout, since the frames may refer to labels.
pub fn encode_stack_map(
    form: StackMapForm,
    frames: &[VerifyFrame],
    initial_locals: &[DeclaredType],
    pool: &ConstantPool,
    labels: &LabelTable,
) -> Result<Attribute, Error> {
    let attribute = match form {
        StackMapForm::Compact => {
            let table = compact_frames(frames, initial_locals, pool, labels)?;
            log::debug!("Encoded {} frames into a StackMapTable", table.len());
            pool.attribute(&StackMapTable(table))?
        }
        StackMapForm::Legacy => {
            let table = legacy_frames(frames, pool, labels)?;
            log::debug!("Encoded {} frames into a StackMap", table.len());
            pool.attribute(&StackMap(table))?
        }
    };
    Ok(attribute)
}

type Resolved<'a> = VerificationType<&'a str, u16>;

fn resolve_all<'a>(
    types: &'a [DeclaredType],
    labels: &LabelTable,
) -> Result<Vec<Resolved<'a>>, Error> {
    types.iter().map(|typ| typ.resolve_offsets(labels)).collect()
}

fn to_pool(
    types: &[Resolved<'_>],
    pool: &ConstantPool,
) -> Result<Vec<VerificationType<ConstantIndex, u16>>, Error> {
    types.iter().map(|typ| typ.resolve_classes(pool)).collect()
}

fn compact_frames(
    frames: &[VerifyFrame],
    initial_locals: &[DeclaredType],
    pool: &ConstantPool,
    labels: &LabelTable,
) -> Result<Vec<StackMapFrame>, Error> {
    let mut previous_locals: Vec<Resolved> = resolve_all(initial_locals, labels)?;
    let mut previous_offset: Option<u16> = None;
    let mut table = Vec::with_capacity(frames.len());

    for frame in frames {
        let offset = frame.offset.resolve(labels)?;
        let offset_delta = match previous_offset {
            None => offset,
            Some(previous) if offset > previous => offset - previous - 1,
            Some(previous) => {
                let msg = format!(
                    "stack map frames out of order: frame at offset {} follows frame at offset {}",
                    offset, previous
                );
                return Err(Error::internal(msg));
            }
        };

        let locals = resolve_all(&frame.locals, labels)?;
        let stack = resolve_all(&frame.stack, labels)?;
        let encoded = select_frame(offset_delta, &previous_locals, &locals, &stack, pool)?;
        table.push(encoded);

        previous_locals = locals;
        previous_offset = Some(offset);
    }

    Ok(table)
}

/// Pick the smallest encoding for a frame, given the locals of the frame before it
fn select_frame(
    offset_delta: u16,
    previous_locals: &[Resolved],
    locals: &[Resolved],
    stack: &[Resolved],
    pool: &ConstantPool,
) -> Result<StackMapFrame, Error> {
    let same_locals = previous_locals == locals;

    let frame = match stack {
        [stack] if same_locals => StackMapFrame::SameLocalsOneStack {
            offset_delta,
            stack: stack.resolve_classes(pool)?,
        },
        [] if same_locals => StackMapFrame::SameLocalsNoStack { offset_delta },
        [] if locals.len() > previous_locals.len()
            && locals.len() - previous_locals.len() <= 3
            && locals.starts_with(previous_locals) =>
        {
            StackMapFrame::AppendLocalsNoStack {
                offset_delta,
                locals: to_pool(&locals[previous_locals.len()..], pool)?,
            }
        }
        [] if locals.len() < previous_locals.len()
            && previous_locals.len() - locals.len() <= 3
            && previous_locals.starts_with(locals) =>
        {
            StackMapFrame::ChopLocalsNoStack {
                offset_delta,
                chopped_k: (previous_locals.len() - locals.len()) as u8,
            }
        }
        _ => StackMapFrame::Full {
            offset_delta,
            locals: to_pool(locals, pool)?,
            stack: to_pool(stack, pool)?,
        },
    };
    Ok(frame)
}

fn legacy_frames(
    frames: &[VerifyFrame],
    pool: &ConstantPool,
    labels: &LabelTable,
) -> Result<Vec<LegacyFrame>, Error> {
    let mut table = frames
        .iter()
        .map(|frame| {
            Ok(LegacyFrame {
                offset: frame.offset.resolve(labels)?,
                locals: to_pool(&resolve_all(&frame.locals, labels)?, pool)?,
                stack: to_pool(&resolve_all(&frame.stack, labels)?, pool)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    // `sort_by_key` is stable, so frames at the same offset keep their order
    table.sort_by_key(|frame| frame.offset);
    Ok(table)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::descriptors::ParseDescriptor;
    use crate::jvm::Constant;

    fn object(cls: &str) -> DeclaredType {
        VerificationType::Object(cls.to_owned())
    }

    fn frame(offset: u16, locals: Vec<DeclaredType>, stack: Vec<DeclaredType>) -> VerifyFrame {
        VerifyFrame {
            offset: CodeOffset::Offset(offset),
            locals,
            stack,
        }
    }

    fn pool_with(classes: &[&str]) -> ConstantPool {
        let mut pool = ConstantPool::new();
        for cls in classes {
            pool.add(Constant::class(*cls)).unwrap();
        }
        pool.add(Constant::utf8("StackMapTable")).unwrap();
        pool.add(Constant::utf8("StackMap")).unwrap();
        pool.finalize().unwrap();
        pool
    }

    fn compact(frames: &[VerifyFrame], initial: &[DeclaredType], pool: &ConstantPool) -> Vec<StackMapFrame> {
        compact_frames(frames, initial, pool, &LabelTable::new()).unwrap()
    }

    #[test]
    fn same_frame_uses_delta_as_tag() {
        let pool = pool_with(&["Foo"]);
        let initial = vec![VerificationType::Integer, object("Foo")];
        let frames = vec![frame(5, initial.clone(), vec![])];
        let table = compact(&frames, &initial, &pool);
        assert_eq!(table, vec![StackMapFrame::SameLocalsNoStack { offset_delta: 5 }]);

        let attribute = pool.attribute(&StackMapTable(table)).unwrap();
        assert_eq!(attribute.info, vec![0, 1, 5]);
    }

    #[test]
    fn later_deltas_are_offset_by_one() {
        let pool = pool_with(&[]);
        let frames = vec![frame(3, vec![], vec![]), frame(10, vec![], vec![])];
        let table = compact(&frames, &[], &pool);
        assert_eq!(
            table,
            vec![
                StackMapFrame::SameLocalsNoStack { offset_delta: 3 },
                StackMapFrame::SameLocalsNoStack { offset_delta: 6 },
            ]
        );
    }

    #[test]
    fn append_and_chop() {
        let pool = pool_with(&[]);
        let initial = vec![VerificationType::Integer];
        let appended = vec![
            VerificationType::Integer,
            VerificationType::Long,
            VerificationType::Float,
        ];
        let frames = vec![
            frame(4, appended, vec![]),
            frame(8, vec![], vec![]),
        ];
        let table = compact(&frames, &initial, &pool);
        assert_eq!(
            table,
            vec![
                StackMapFrame::AppendLocalsNoStack {
                    offset_delta: 4,
                    locals: vec![VerificationType::Long, VerificationType::Float],
                },
                StackMapFrame::ChopLocalsNoStack {
                    offset_delta: 3,
                    chopped_k: 3,
                },
            ]
        );
        let attribute = pool.attribute(&StackMapTable(table)).unwrap();
        assert_eq!(attribute.info[2], 253);
    }

    #[test]
    fn one_stack_item_and_full_frames() {
        let pool = pool_with(&["java/lang/Throwable"]);
        let initial = vec![VerificationType::Integer];
        let frames = vec![
            frame(2, initial.clone(), vec![object("java/lang/Throwable")]),
            frame(9, vec![VerificationType::Float], vec![VerificationType::Integer]),
        ];
        let table = compact(&frames, &initial, &pool);
        let throwable = pool.class_index("java/lang/Throwable").unwrap();
        assert_eq!(
            table,
            vec![
                StackMapFrame::SameLocalsOneStack {
                    offset_delta: 2,
                    stack: VerificationType::Object(throwable),
                },
                StackMapFrame::Full {
                    offset_delta: 6,
                    locals: vec![VerificationType::Float],
                    stack: vec![VerificationType::Integer],
                },
            ]
        );
    }

    #[test]
    fn out_of_order_frames_are_rejected() {
        let pool = pool_with(&[]);
        let frames = vec![frame(10, vec![], vec![]), frame(5, vec![], vec![])];
        let err = compact_frames(&frames, &[], &pool, &LabelTable::new()).unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn legacy_frames_are_sorted() {
        let pool = pool_with(&[]);
        let frames = vec![
            frame(10, vec![VerificationType::Integer], vec![]),
            frame(5, vec![], vec![VerificationType::Null]),
        ];
        let table = legacy_frames(&frames, &pool, &LabelTable::new()).unwrap();
        assert_eq!(table[0].offset, 5);
        assert_eq!(table[1].offset, 10);
        assert_eq!(table[1].locals, vec![VerificationType::Integer]);
    }

    #[test]
    fn uninitialized_labels_resolve_lazily() {
        let pool = pool_with(&[]);
        let mut labels = LabelTable::new();
        let new_insn = labels.label("New");
        let uninit: DeclaredType = VerificationType::Uninitialized(CodeOffset::Label(new_insn));
        let frames = vec![
            frame(4, vec![], vec![uninit]),
            frame(7, vec![], vec![VerificationType::Uninitialized(CodeOffset::Offset(1))]),
        ];

        // Label has not been laid out yet
        assert!(compact_frames(&frames, &[], &pool, &labels).is_err());

        labels.place(new_insn).unwrap();
        labels.set_offset(new_insn, 1);
        let table = compact_frames(&frames, &[], &pool, &labels).unwrap();
        assert_eq!(
            table[1],
            StackMapFrame::SameLocalsOneStack {
                offset_delta: 2,
                stack: VerificationType::Uninitialized(1),
            }
        );
    }

    #[test]
    fn initial_frame_from_descriptor() {
        let descriptor = MethodDescriptor::parse("(JLjava/lang/String;)V").unwrap();
        assert_eq!(
            initial_locals("Foo", "<init>", &descriptor, false),
            vec![
                VerificationType::UninitializedThis,
                VerificationType::Long,
                object("java/lang/String"),
            ]
        );
        assert_eq!(
            initial_locals("java/lang/Object", "<init>", &descriptor, false)[0],
            object("java/lang/Object")
        );
        assert_eq!(initial_locals("Foo", "run", &descriptor, false)[0], object("Foo"));
        assert_eq!(initial_locals("Foo", "run", &descriptor, true).len(), 2);
    }

    #[test]
    fn copying_previous_locals() {
        let previous = vec![VerificationType::Integer, object("Foo")];
        let mut current = VerifyFrame::new(CodeOffset::Offset(0));
        current.push_local(VerificationType::Float);
        current.copy_locals_from(&previous, 1).unwrap();
        assert_eq!(
            current.locals,
            vec![VerificationType::Integer, VerificationType::Float]
        );

        assert!(current.copy_locals_from(&previous, 3).is_err());
    }

    #[test]
    fn setting_a_local_pads_with_top() {
        let mut current = VerifyFrame::new(CodeOffset::Offset(0));
        current.set_local(2, VerificationType::Integer);
        assert_eq!(
            current.locals,
            vec![VerificationType::Top, VerificationType::Top, VerificationType::Integer]
        );
    }
}
