//! Bootstrap: builds the kernel class hierarchy, installs native methods,
//! registers the well-known globals, then loads the in-language kernel
//! sources (embedded defaults, overridable from the home directory, or
//! replaced wholesale by `--bootstrap`).

use crate::core::{Managed, ObjectId, Sym, Value};
use crate::error::{ErrKind, KoanError};
use crate::object::{merge_slots, new_instance, recompute_merged, ClassObj};
use crate::primitives;
use crate::runtime::Runtime;

/// The classes the machine itself needs to know by id.
pub struct KernelClasses {
    pub object: ObjectId,
    pub class: ObjectId,
    pub number: ObjectId,
    pub integer: ObjectId,
    pub float: ObjectId,
    pub boolean: ObjectId,
    pub true_class: ObjectId,
    pub false_class: ObjectId,
    pub undefined: ObjectId,
    pub string: ObjectId,
    pub symbol: ObjectId,
    pub array: ObjectId,
    pub table: ObjectId,
    pub block: ObjectId,
    pub exception: ObjectId,
    pub error: ObjectId,
    pub name_error: ObjectId,
    pub arity_error: ObjectId,
    pub not_understood: ObjectId,
    pub ambiguous: ObjectId,
    pub slot_conflict: ObjectId,
    pub subscript: ObjectId,
    pub division_by_zero: ObjectId,
    pub type_error: ObjectId,
    pub block_expired: ObjectId,
    pub stack_overflow: ObjectId,
    pub process_error: ObjectId,
    pub process: ObjectId,
    pub scheduler: ObjectId,
    pub semaphore: ObjectId,
    pub channel: ObjectId,
    pub filestream: ObjectId,
    pub testcase: ObjectId,
}

const UNSET: ObjectId = ObjectId(usize::MAX);

impl Default for KernelClasses {
    fn default() -> Self {
        Self {
            object: UNSET,
            class: UNSET,
            number: UNSET,
            integer: UNSET,
            float: UNSET,
            boolean: UNSET,
            true_class: UNSET,
            false_class: UNSET,
            undefined: UNSET,
            string: UNSET,
            symbol: UNSET,
            array: UNSET,
            table: UNSET,
            block: UNSET,
            exception: UNSET,
            error: UNSET,
            name_error: UNSET,
            arity_error: UNSET,
            not_understood: UNSET,
            ambiguous: UNSET,
            slot_conflict: UNSET,
            subscript: UNSET,
            division_by_zero: UNSET,
            type_error: UNSET,
            block_expired: UNSET,
            stack_overflow: UNSET,
            process_error: UNSET,
            process: UNSET,
            scheduler: UNSET,
            semaphore: UNSET,
            channel: UNSET,
            filestream: UNSET,
            testcase: UNSET,
        }
    }
}

impl KernelClasses {
    pub fn class_for(&self, kind: ErrKind) -> ObjectId {
        match kind {
            ErrKind::Name => self.name_error,
            ErrKind::Arity => self.arity_error,
            ErrKind::MessageNotUnderstood => self.not_understood,
            ErrKind::AmbiguousMethod => self.ambiguous,
            ErrKind::SlotConflict => self.slot_conflict,
            ErrKind::Subscript => self.subscript,
            ErrKind::DivisionByZero => self.division_by_zero,
            ErrKind::Type => self.type_error,
            ErrKind::BlockContextExpired => self.block_expired,
            ErrKind::StackOverflow => self.stack_overflow,
            ErrKind::Process => self.process_error,
            ErrKind::Error => self.error,
        }
    }

    pub(crate) fn push_roots(&self, roots: &mut Vec<Value>) {
        for id in [
            self.object,
            self.class,
            self.number,
            self.integer,
            self.float,
            self.boolean,
            self.true_class,
            self.false_class,
            self.undefined,
            self.string,
            self.symbol,
            self.array,
            self.table,
            self.block,
            self.exception,
            self.error,
            self.name_error,
            self.arity_error,
            self.not_understood,
            self.ambiguous,
            self.slot_conflict,
            self.subscript,
            self.division_by_zero,
            self.type_error,
            self.block_expired,
            self.stack_overflow,
            self.process_error,
            self.process,
            self.scheduler,
            self.semaphore,
            self.channel,
            self.filestream,
            self.testcase,
        ] {
            if id != UNSET {
                roots.push(Value::Class(id));
            }
        }
    }
}

/// Kernel sources in load order; each may be shadowed by
/// `<home>/kernel/<name>.koan`.
const KERNEL_SOURCES: &[(&str, &str)] = &[
    ("object", include_str!("kernel/object.koan")),
    ("boolean", include_str!("kernel/boolean.koan")),
    ("block", include_str!("kernel/block.koan")),
    ("number", include_str!("kernel/number.koan")),
    ("string", include_str!("kernel/string.koan")),
    ("collections", include_str!("kernel/collections.koan")),
    ("exception", include_str!("kernel/exception.koan")),
    ("process", include_str!("kernel/process.koan")),
    ("stream", include_str!("kernel/stream.koan")),
    ("testcase", include_str!("kernel/testcase.koan")),
];

fn def_class(rt: &mut Runtime, name: &str, parents: &[ObjectId], slots: &[&str]) -> ObjectId {
    let own: Vec<Sym> = slots.iter().map(|s| rt.syms.intern(s)).collect();
    let merged = merge_slots(&rt.heap, parents, &own, &rt.syms)
        .expect("kernel slot lists never conflict");
    let mut class = ClassObj::new(name);
    class.parents = parents.to_vec();
    class.own_slots = own;
    class.slots = merged;
    let id = rt.heap.alloc(Managed::Class(Box::new(class)));
    for &p in parents {
        rt.heap.class_mut(p).subclasses.push(id);
    }
    rt.globals.insert(name.to_string(), Value::Class(id));
    id
}

pub(crate) fn install(rt: &mut Runtime) -> Result<(), KoanError> {
    let object = def_class(rt, "Object", &[], &[]);
    rt.kernel.object = object;
    rt.kernel.class = def_class(rt, "Class", &[object], &[]);
    rt.kernel.number = def_class(rt, "Number", &[object], &[]);
    rt.kernel.integer = def_class(rt, "Integer", &[rt.kernel.number], &[]);
    rt.kernel.float = def_class(rt, "Float", &[rt.kernel.number], &[]);
    rt.kernel.boolean = def_class(rt, "Boolean", &[object], &[]);
    rt.kernel.true_class = def_class(rt, "True", &[rt.kernel.boolean], &[]);
    rt.kernel.false_class = def_class(rt, "False", &[rt.kernel.boolean], &[]);
    rt.kernel.undefined = def_class(rt, "UndefinedObject", &[object], &[]);
    rt.kernel.string = def_class(rt, "String", &[object], &[]);
    rt.kernel.symbol = def_class(rt, "Symbol", &[object], &[]);
    rt.kernel.array = def_class(rt, "Array", &[object], &[]);
    rt.kernel.table = def_class(rt, "Table", &[object], &[]);
    rt.kernel.block = def_class(rt, "Block", &[object], &[]);
    rt.kernel.exception = def_class(rt, "Exception", &[object], &["messageText"]);
    rt.kernel.error = def_class(rt, "Error", &[rt.kernel.exception], &[]);
    let error = rt.kernel.error;
    rt.kernel.name_error = def_class(rt, "NameError", &[error], &[]);
    rt.kernel.arity_error = def_class(rt, "ArityError", &[error], &[]);
    rt.kernel.not_understood = def_class(rt, "MessageNotUnderstood", &[error], &[]);
    rt.kernel.ambiguous = def_class(rt, "AmbiguousMethod", &[error], &[]);
    rt.kernel.slot_conflict = def_class(rt, "SlotConflict", &[error], &[]);
    rt.kernel.subscript = def_class(rt, "SubscriptOutOfBounds", &[error], &[]);
    rt.kernel.division_by_zero = def_class(rt, "DivisionByZero", &[error], &[]);
    rt.kernel.type_error = def_class(rt, "TypeError", &[error], &[]);
    rt.kernel.block_expired = def_class(rt, "BlockContextExpired", &[error], &[]);
    rt.kernel.stack_overflow = def_class(rt, "StackOverflow", &[error], &[]);
    rt.kernel.process_error = def_class(rt, "ProcessError", &[error], &[]);
    rt.kernel.process = def_class(rt, "Process", &[object], &[]);
    rt.kernel.scheduler = def_class(rt, "Scheduler", &[object], &[]);
    rt.kernel.semaphore = def_class(rt, "Semaphore", &[object], &[]);
    rt.kernel.channel = def_class(rt, "Channel", &[object], &[]);
    rt.kernel.filestream = def_class(rt, "FileStream", &[object], &[]);
    rt.kernel.testcase = def_class(rt, "TestCase", &[object], &[]);

    primitives::object::install(rt);
    primitives::class::install(rt);
    primitives::number::install(rt);
    primitives::string::install(rt);
    primitives::array::install(rt);
    primitives::table::install(rt);
    primitives::block::install(rt);
    primitives::exception::install(rt);
    primitives::process::install(rt);
    primitives::stream::install(rt);

    recompute_merged(&mut rt.heap, object);

    let processor = new_instance(&mut rt.heap, rt.kernel.scheduler);
    rt.globals
        .insert("Processor".to_string(), Value::Instance(processor));
    let stdout = new_instance(&mut rt.heap, rt.kernel.filestream);
    if let Managed::Instance(inst) = rt.heap.get_mut(stdout) {
        inst.native = Some(1);
    }
    rt.globals
        .insert("Stdout".to_string(), Value::Instance(stdout));

    if let Some(path) = rt.config.bootstrap.clone() {
        let text = std::fs::read_to_string(&path)?;
        rt.eval_source(&path.display().to_string(), &text)?;
        return Ok(());
    }
    for (name, embedded) in KERNEL_SOURCES {
        let text = kernel_text(rt, name, embedded)?;
        rt.eval_source(&format!("kernel/{}.koan", name), &text)?;
    }
    Ok(())
}

fn kernel_text(rt: &Runtime, name: &str, embedded: &str) -> Result<String, KoanError> {
    if let Some(home) = &rt.config.home {
        let path = home.join("kernel").join(format!("{}.koan", name));
        if path.exists() {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    Ok(embedded.to_string())
}
