/// Elements with a width, measured in JVM slots
///
/// Most things occupy a single slot, but `long` and `double` values take two: both in the
/// constant pool and in the local variables of a method.
pub trait Width {
    fn width(&self) -> usize;
}
