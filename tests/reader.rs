use jvmasm::assemble::reader::assemble_str;
use jvmasm::assemble::{Error, Settings};
use jvmasm::jvm::class_file::ClassFile;

fn assemble(source: &str) -> ClassFile {
    assemble_str(source, Settings::default()).unwrap()
}

fn errors(source: &str) -> Vec<String> {
    match assemble_str(source, Settings::default()) {
        Err(Error::Assembly(diagnostics)) => diagnostics.iter().map(|d| d.to_string()).collect(),
        other => panic!("expected errors, got {:?}", other.map(|_| ())),
    }
}

const COUNTER: &str = r#"
.source Counter.j
.class public Counter
.super java/lang/Object
.implements java/lang/Runnable

.field private count I
.field public static final STEP J = 2

.method public <init>()V
    aload_0
    invokespecial java/lang/Object/<init>()V
    return
.end method

; count up to 10
.method public run()V
    .limit stack 3
    .limit locals 2
    iconst_0
    istore_1
loop:
    iload_1
    bipush 10
    if_icmpge done
    aload_0
    dup
    getfield Counter/count I
    iconst_1
    iadd
    putfield Counter/count I
    iinc 1 1
    goto loop
done:
    return
.end method
"#;

#[test]
fn assemble_counter() {
    let class_file = assemble(COUNTER);
    assert_eq!(class_file.interfaces.len(), 1);
    assert_eq!(class_file.fields.len(), 2);
    assert_eq!(class_file.methods.len(), 2);

    // Only `SourceFile`
    assert_eq!(class_file.attributes.len(), 1);

    let code = &class_file.methods[1].attributes[0].info;
    assert_eq!(&code[0..4], &[0, 3, 0, 2]);

    // `goto loop` jumps back from offset 21 to 2
    let bytecode = &code[8..];
    assert_eq!(bytecode[21], 0xa7);
    assert_eq!(i16::from_be_bytes([bytecode[22], bytecode[23]]), -19);

    // `if_icmpge done` jumps forward from 5 to 24
    assert_eq!(bytecode[5], 0xa2);
    assert_eq!(i16::from_be_bytes([bytecode[6], bytecode[7]]), 19);
}

#[test]
fn auto_line_numbers() {
    let settings = Settings {
        auto_line_numbers: true,
        ..Settings::default()
    };
    let class_file = assemble_str(COUNTER, settings).unwrap();

    // Every method gets a line number table
    for method in &class_file.methods {
        let code = &method.attributes[0].info;
        let len = u32::from_be_bytes([code[4], code[5], code[6], code[7]]) as usize;
        let attributes = 8 + len + 2;
        assert_eq!(&code[attributes..attributes + 2], &[0, 1]);
    }
}

#[test]
fn interfaces_are_abstract() {
    let class_file = assemble(
        "
        .interface public Shape
        .super java/lang/Object
        .method public abstract area()D
        .end method
        ",
    );
    assert_eq!(class_file.access_flags.bits(), 0x0601);
    assert!(class_file.methods[0].attributes.is_empty());
}

#[test]
fn every_error_is_reported() {
    let messages = errors(
        "\
.class Broken
.super java/lang/Object
.field static b B = 300
.method static f()V
    .limit stack
    iload
    ldc \"unterminated
    goto missing
.end method
.method static g()V
",
    );
    assert_eq!(messages.len(), 6);
    assert!(messages[0].starts_with("line 3: value out of range"));
    assert!(messages[1].starts_with("line 5: "));
    assert!(messages[2].starts_with("line 6: "));
    assert_eq!(messages[3], "line 7: unterminated string");
    assert_eq!(messages[4], "line 9: undefined label(s): missing");
    assert_eq!(messages[5], "line 10: missing '.end method' at end of class");
}

#[test]
fn missing_header() {
    let messages = errors(".method static f()V\n    return\n.end method\n");
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("'.class'"));
    assert!(messages[1].contains("'.super'"));
}
