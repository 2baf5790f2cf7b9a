//! Line-oriented reader for a small Jasmin-like syntax
//!
//! Every line holds one directive, label, or instruction. Operands are separated by whitespace,
//! strings are double-quoted, and a `;` at the start of a word begins a comment (so descriptors
//! like `Ljava/lang/String;` are left alone). Switches span several lines:
//!
//! ```text
//! tableswitch 0 1      lookupswitch
//!     zero                 1 : one
//!     one                  10 : ten
//!     default : other      default : other
//! ```

use crate::assemble::{Argument, ClassAssembler, Error, Literal, Settings};
use crate::jvm::class_file::{ClassFile, Version};
use crate::jvm::code::{Opcode, OperandKind};
use crate::jvm::{self, ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use std::num::IntErrorKind;

/// Feed every line of `source` to the assembler
pub fn read_source(assembler: &mut ClassAssembler, source: &str) {
    let mut reader = Reader {
        assembler,
        line: 0,
        frame: None,
        switch: None,
    };
    for (index, line) in source.lines().enumerate() {
        reader.line = index + 1;
        reader.assembler.set_line(reader.line);
        reader.read_line(line);
    }
    if reader.switch.take().is_some() {
        reader.assembler.error(unterminated_switch());
    }
    if reader.frame.take().is_some() {
        let error = jvm::Error::structural("missing '.end stack' at end of source");
        reader.assembler.error(error);
    }
}

/// Assemble a whole source unit
pub fn assemble_str(source: &str, settings: Settings) -> Result<ClassFile, Error> {
    let mut assembler = ClassAssembler::new(settings);
    read_source(&mut assembler, source);
    assembler.finish()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Quoted(string) => string,
        }
    }

    fn word(&self) -> Result<&str, jvm::Error> {
        match self {
            Token::Word(word) => Ok(word),
            Token::Quoted(string) => {
                let msg = format!("unexpected string \"{}\"", string);
                Err(jvm::Error::structural(msg))
            }
        }
    }

    fn is_word(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(word) if word == keyword)
    }
}

fn tokenize(line: &str) -> Result<Vec<Token>, jvm::Error> {
    let mut tokens = vec![];
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.peek() {
            None | Some(';') => break,
            Some('"') => {
                chars.next();
                let mut string = String::new();
                loop {
                    match chars.next() {
                        None => return Err(jvm::Error::structural("unterminated string")),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => string.push('"'),
                            Some('\\') => string.push('\\'),
                            Some('n') => string.push('\n'),
                            Some('t') => string.push('\t'),
                            Some(other) => {
                                let msg = format!("unknown escape '\\{}'", other);
                                return Err(jvm::Error::structural(msg));
                            }
                            None => return Err(jvm::Error::structural("unterminated string")),
                        },
                        Some(c) => string.push(c),
                    }
                }
                tokens.push(Token::Quoted(string));
            }
            Some(_) => {
                let mut word = String::new();
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    word.push(c);
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

/// Switch whose targets are still being read
struct PendingSwitch {
    line: usize,

    /// Bounds of a `tableswitch`, `None` for a `lookupswitch`
    table: Option<(i64, Option<i64>)>,
    targets: Vec<String>,
    pairs: Vec<(i64, String)>,
}

struct Reader<'a> {
    assembler: &'a mut ClassAssembler,
    line: usize,

    /// Inside `.stack`, and whether the frame was accepted
    frame: Option<bool>,
    switch: Option<PendingSwitch>,
}

impl Reader<'_> {
    fn read_line(&mut self, line: &str) {
        let tokens = match tokenize(line) {
            Ok(tokens) if tokens.is_empty() => return,
            Ok(tokens) => tokens,
            Err(error) => {
                self.assembler.error(error);
                return;
            }
        };

        if self.switch.is_some() {
            if !tokens[0].text().starts_with('.') {
                if let Err(error) = self.switch_entry(&tokens) {
                    self.assembler.error(error);
                }
                return;
            }
            self.switch = None;
            self.assembler.error(unterminated_switch());
        }
        if let Err(error) = self.statement(&tokens) {
            self.assembler.error(error);
        }
    }

    fn statement(&mut self, tokens: &[Token]) -> Result<(), jvm::Error> {
        let first = tokens[0].word()?;
        let rest = &tokens[1..];
        if let Some(label) = first.strip_suffix(':') {
            self.assembler.plant_label(label);
            return if rest.is_empty() {
                Ok(())
            } else {
                self.statement(rest)
            };
        }

        if let Some(accepted) = self.frame {
            self.frame_line(accepted, first, rest)
        } else if first.starts_with('.') {
            self.directive(first, rest)
        } else {
            self.instruction(first, rest)
        }
    }

    fn directive(&mut self, directive: &str, args: &[Token]) -> Result<(), jvm::Error> {
        match directive {
            ".class" | ".interface" => {
                let (name, flags) = args
                    .split_last()
                    .ok_or_else(|| usage(directive, "[<flags>] <name>"))?;
                let mut flags = ClassAccessFlags::from_keywords(words(flags)?)?;
                if directive == ".interface" {
                    flags |= ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
                }
                self.assembler.set_class(flags, name.word()?);
            }
            ".super" => self.assembler.set_super(single(directive, args)?.word()?),
            ".implements" => self.assembler.add_interface(single(directive, args)?.word()?),
            ".source" => self.assembler.set_source(single(directive, args)?.text()),
            ".bytecode" => {
                let version: Version = single(directive, args)?.word()?.parse()?;
                self.assembler.set_version(version);
            }
            ".signature" => self.assembler.set_signature(single(directive, args)?.text()),
            ".deprecated" => {
                none(directive, args)?;
                self.assembler.set_deprecated();
            }
            ".field" => self.field(args)?,
            ".method" => {
                let (signature, flags) = args
                    .split_last()
                    .ok_or_else(|| usage(directive, "[<flags>] <name><descriptor>"))?;
                let signature = signature.word()?;
                let paren = signature
                    .find('(')
                    .ok_or_else(|| usage(directive, "[<flags>] <name><descriptor>"))?;
                let (name, descriptor) = signature.split_at(paren);
                let flags = MethodAccessFlags::from_keywords(words(flags)?)?;
                self.assembler.begin_method(flags, name, descriptor);
            }
            ".end" => match single(directive, args)?.word()? {
                "field" => self.assembler.end_field(),
                "method" => self.assembler.end_method(),
                "stack" => return Err(jvm::Error::structural("'.end stack' without '.stack'")),
                other => {
                    let msg = format!("unknown block '.end {}'", other);
                    return Err(jvm::Error::structural(msg));
                }
            },
            ".limit" => match args {
                [what, value] if what.is_word("stack") => {
                    self.assembler.set_limit_stack(parse_int(value.word()?)?)
                }
                [what, value] if what.is_word("locals") => {
                    self.assembler.set_limit_locals(parse_int(value.word()?)?)
                }
                _ => return Err(usage(directive, "stack|locals <n>")),
            },
            ".throws" => self.assembler.add_throws(single(directive, args)?.word()?),
            ".catch" => match args {
                [class, from, start, to, end, using, handler]
                    if from.is_word("from") && to.is_word("to") && using.is_word("using") =>
                {
                    let class = match class.word()? {
                        "all" => None,
                        class => Some(class),
                    };
                    self.assembler
                        .add_catch(class, start.word()?, end.word()?, handler.word()?);
                }
                _ => return Err(usage(directive, "<class> from <label> to <label> using <label>")),
            },
            ".line" => self.assembler.add_line(parse_int(single(directive, args)?.word()?)?),
            ".var" => self.var(args)?,
            ".stack" => {
                none(directive, args)?;
                let errors = self.assembler.diagnostics().len();
                self.assembler.begin_frame();
                self.frame = Some(self.assembler.diagnostics().len() == errors);
            }
            _ => {
                let msg = format!("unknown directive '{}'", directive);
                return Err(jvm::Error::structural(msg));
            }
        }
        Ok(())
    }

    /// `.field <flags> <name> <descriptor> [= <value>]`
    fn field(&mut self, args: &[Token]) -> Result<(), jvm::Error> {
        let (declaration, value) = match args.iter().position(|token| token.is_word("=")) {
            Some(equals) => (&args[..equals], Some(&args[equals + 1..])),
            None => (args, None),
        };
        if declaration.len() < 2 {
            return Err(usage(".field", "[<flags>] <name> <descriptor> [= <value>]"));
        }
        let (flags, declaration) = declaration.split_at(declaration.len() - 2);
        let value = match value {
            None => None,
            Some([value]) => Some(literal(value)?),
            Some(_) => return Err(jvm::Error::structural("expected one value after '='")),
        };
        let flags = FieldAccessFlags::from_keywords(words(flags)?)?;
        let name = declaration[0].word()?;
        let descriptor = declaration[1].word()?;
        self.assembler.begin_field(flags, name, descriptor, value);
        Ok(())
    }

    /// `.var <n> is <name> <descriptor> [signature <sig>] [from <label> to <label>]`
    fn var(&mut self, args: &[Token]) -> Result<(), jvm::Error> {
        const USAGE: &str = "<n> is <name> <descriptor> [signature <sig>] [from <label> to <label>]";
        let (index, name, descriptor, mut rest) = match args {
            [index, is, name, descriptor, rest @ ..] if is.is_word("is") => {
                (parse_int(index.word()?)?, name.text(), descriptor.word()?, rest)
            }
            _ => return Err(usage(".var", USAGE)),
        };
        let mut signature = None;
        if let [keyword, sig, tail @ ..] = rest {
            if keyword.is_word("signature") {
                signature = Some(sig.text());
                rest = tail;
            }
        }
        let range = match rest {
            [] => None,
            [from, start, to, end] if from.is_word("from") && to.is_word("to") => {
                Some((start.word()?, end.word()?))
            }
            _ => return Err(usage(".var", USAGE)),
        };
        self.assembler
            .add_var(index, name, descriptor, signature, range);
        Ok(())
    }

    /// Lines between `.stack` and `.end stack`
    fn frame_line(&mut self, accepted: bool, first: &str, args: &[Token]) -> Result<(), jvm::Error> {
        if first == ".end" {
            if !matches!(args, [block] if block.is_word("stack")) {
                return Err(jvm::Error::structural("expected '.end stack'"));
            }
            self.frame = None;
            if accepted {
                self.assembler.end_frame();
            }
            return Ok(());
        }

        let typed = |args: &[Token]| -> Result<(String, Option<String>), jvm::Error> {
            match args {
                [typ] => Ok((typ.word()?.to_owned(), None)),
                [typ, arg] => Ok((typ.word()?.to_owned(), Some(arg.word()?.to_owned()))),
                _ => Err(usage(first, "<type> [<argument>]")),
            }
        };
        match first {
            "offset" => {
                let position = single(first, args)?.word()?;
                if accepted {
                    self.assembler.frame_offset(position);
                }
            }
            "locals" => {
                let (typ, arg) = typed(args)?;
                if accepted {
                    self.assembler.frame_locals(&typ, arg.as_deref());
                }
            }
            "stack" => {
                let (typ, arg) = typed(args)?;
                if accepted {
                    self.assembler.frame_stack(&typ, arg.as_deref());
                }
            }
            "use" => match args {
                [count, locals] if locals.is_word("locals") => {
                    let count = parse_int(count.word()?)?;
                    if accepted {
                        self.assembler.frame_use_locals(count);
                    }
                }
                _ => return Err(usage(first, "<n> locals")),
            },
            _ => {
                let msg = format!("unknown frame directive '{}'", first);
                return Err(jvm::Error::structural(msg));
            }
        }
        Ok(())
    }

    fn instruction(&mut self, mnemonic: &str, args: &[Token]) -> Result<(), jvm::Error> {
        let opcode = match Opcode::lookup(mnemonic) {
            Some(opcode) => opcode,
            None => {
                // Let the assembler report it
                self.assembler.emit(mnemonic, Argument::None);
                return Ok(());
            }
        };

        let argument = match opcode.operand {
            OperandKind::None => {
                none(mnemonic, args)?;
                Argument::None
            }
            OperandKind::LocalVar | OperandKind::Byte | OperandKind::Short => {
                Argument::Int(parse_int(single(mnemonic, args)?.word()?)?)
            }
            OperandKind::Iinc => match args {
                [index, delta] => Argument::IntPair(parse_int(index.word()?)?, parse_int(delta.word()?)?),
                _ => return Err(usage(mnemonic, "<index> <increment>")),
            },
            OperandKind::ArrayType => {
                let word = single(mnemonic, args)?.word()?;
                number(word)?.unwrap_or_else(|| Argument::word(word))
            }
            OperandKind::Branch | OperandKind::BranchWide | OperandKind::Class => {
                Argument::word(single(mnemonic, args)?.word()?)
            }
            OperandKind::Ldc | OperandKind::LdcWide | OperandKind::Ldc2 => {
                match single(mnemonic, args)? {
                    Token::Quoted(string) => Argument::string(string.as_str()),
                    Token::Word(word) => number(word)?.unwrap_or_else(|| Argument::word(word.as_str())),
                }
            }
            OperandKind::Field => match args {
                [path, descriptor] => member(path.word()?, Some(descriptor.word()?))?,
                _ => return Err(usage(mnemonic, "<class>/<name> <descriptor>")),
            },
            OperandKind::Method => member(single(mnemonic, args)?.word()?, None)?,
            OperandKind::InterfaceMethod => match args {
                [path] => member(path.word()?, None)?,
                [path, count] => match member(path.word()?, None)? {
                    Argument::Member(member) => {
                        Argument::InterfaceMember(member, parse_int(count.word()?)?)
                    }
                    other => other,
                },
                _ => return Err(usage(mnemonic, "<class>/<name><descriptor> [<count>]")),
            },
            OperandKind::MultiANewArray => match args {
                [class, dimensions] => {
                    Argument::WordInt(class.word()?.to_owned(), parse_int(dimensions.word()?)?)
                }
                _ => return Err(usage(mnemonic, "<class> <dimensions>")),
            },
            OperandKind::TableSwitch => {
                let table = match args {
                    [low] => (parse_int(low.word()?)?, None),
                    [low, high] => (parse_int(low.word()?)?, Some(parse_int(high.word()?)?)),
                    _ => return Err(usage(mnemonic, "<low> [<high>]")),
                };
                self.begin_switch(Some(table));
                return Ok(());
            }
            OperandKind::LookupSwitch => {
                none(mnemonic, args)?;
                self.begin_switch(None);
                return Ok(());
            }
        };
        self.assembler.emit(mnemonic, argument);
        Ok(())
    }

    fn begin_switch(&mut self, table: Option<(i64, Option<i64>)>) {
        self.switch = Some(PendingSwitch {
            line: self.line,
            table,
            targets: vec![],
            pairs: vec![],
        });
    }

    /// Target line of a switch (`<label>`, `<key> : <label>`, or `default : <label>`)
    fn switch_entry(&mut self, tokens: &[Token]) -> Result<(), jvm::Error> {
        let entry = tokens
            .iter()
            .map(Token::word)
            .collect::<Result<String, _>>()?;
        if let Some(default) = entry.strip_prefix("default:") {
            if default.is_empty() {
                return Err(jvm::Error::structural("missing switch target"));
            }
            if let Some(switch) = self.switch.take() {
                self.end_switch(switch, default.to_owned());
            }
            return Ok(());
        }

        let switch = match &mut self.switch {
            Some(switch) => switch,
            None => return Ok(()),
        };
        match (entry.split_once(':'), switch.table.is_some()) {
            (Some((_, "")), _) => Err(jvm::Error::structural("missing switch target")),
            (Some((key, target)), false) => {
                switch.pairs.push((parse_int(key)?, target.to_owned()));
                Ok(())
            }
            (None, true) => {
                switch.targets.push(entry.clone());
                Ok(())
            }
            (Some(_), true) => Err(jvm::Error::structural("tableswitch targets are plain labels")),
            (None, false) => Err(jvm::Error::structural("expected '<key> : <label>'")),
        }
    }

    fn end_switch(&mut self, switch: PendingSwitch, default: String) {
        let (mnemonic, argument) = match switch.table {
            Some((low, high)) => (
                "tableswitch",
                Argument::TableSwitch {
                    low,
                    high,
                    targets: switch.targets,
                    default,
                },
            ),
            None => (
                "lookupswitch",
                Argument::LookupSwitch {
                    pairs: switch.pairs,
                    default,
                },
            ),
        };
        self.assembler.set_line(switch.line);
        self.assembler.emit(mnemonic, argument);
        self.assembler.set_line(self.line);
    }
}

fn usage(what: &str, form: &str) -> jvm::Error {
    jvm::Error::structural(format!("expected '{} {}'", what, form))
}

fn unterminated_switch() -> jvm::Error {
    jvm::Error::structural("switch is missing its 'default' target")
}

fn single<'t>(what: &str, args: &'t [Token]) -> Result<&'t Token, jvm::Error> {
    match args {
        [token] => Ok(token),
        _ => Err(jvm::Error::structural(format!(
            "'{}' takes one operand but got {}",
            what,
            args.len()
        ))),
    }
}

fn none(what: &str, args: &[Token]) -> Result<(), jvm::Error> {
    if args.is_empty() {
        Ok(())
    } else {
        let msg = format!("'{}' takes no operand but got {}", what, args.len());
        Err(jvm::Error::structural(msg))
    }
}

fn words(tokens: &[Token]) -> Result<Vec<&str>, jvm::Error> {
    tokens.iter().map(Token::word).collect()
}

/// `<class>/<name>` with a separate descriptor, or `<class>/<name>(<args>)<ret>`
fn member(path: &str, descriptor: Option<&str>) -> Result<Argument, jvm::Error> {
    let (path, descriptor) = match descriptor {
        Some(descriptor) => (path, descriptor),
        None => {
            let paren = path.find('(').ok_or_else(|| {
                jvm::Error::structural(format!("'{}' is missing a method descriptor", path))
            })?;
            path.split_at(paren)
        }
    };
    let (class, name) = path.rsplit_once('/').ok_or_else(|| {
        jvm::Error::structural(format!("'{}' is not of the form <class>/<name>", path))
    })?;
    Ok(Argument::member(class, name, descriptor))
}

fn literal(token: &Token) -> Result<Literal, jvm::Error> {
    match token {
        Token::Quoted(string) => Ok(Literal::String(string.clone())),
        Token::Word(word) => match number(word)? {
            Some(Argument::Int(value)) => Ok(Literal::Int(value)),
            Some(Argument::Float(value)) => Ok(Literal::Float(value)),
            _ => {
                let msg = format!("'{}' is not a constant value", word);
                Err(jvm::Error::structural(msg))
            }
        },
    }
}

/// Decimal or `0x` hexadecimal integer
fn parse_int(text: &str) -> Result<i64, jvm::Error> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    };
    match parsed {
        Ok(value) if negative => Ok(-value),
        Ok(value) => Ok(value),
        Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(jvm::Error::numeric(format!("integer {} is out of range", text)))
        }
        Err(_) => Err(jvm::Error::structural(format!("expected an integer, found '{}'", text))),
    }
}

/// Integer or floating point literal (`None` if the word doesn't look like a number)
fn number(word: &str) -> Result<Option<Argument>, jvm::Error> {
    if !word.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.')) {
        return Ok(None);
    }
    match parse_int(word) {
        Ok(value) => return Ok(Some(Argument::Int(value))),
        Err(err) if err.is_numeric() => return Err(err),
        Err(_) => (),
    }
    match word.parse::<f64>() {
        Ok(value) => Ok(Some(Argument::Float(value))),
        Err(_) => Err(jvm::Error::structural(format!("malformed number '{}'", word))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn words_of(line: &str) -> Vec<String> {
        tokenize(line)
            .unwrap()
            .iter()
            .map(|token| token.text().to_owned())
            .collect()
    }

    fn diagnostic_lines(source: &str) -> Vec<Option<usize>> {
        match assemble_str(source, Settings::default()) {
            Err(Error::Assembly(diagnostics)) => diagnostics.iter().map(|d| d.line).collect(),
            other => panic!("expected errors, got {:?}", other.map(|_| ())),
        }
    }

    fn code_of(class_file: &ClassFile) -> Vec<u8> {
        let code = &class_file.methods[0].attributes[0].info;
        let len = u32::from_be_bytes([code[4], code[5], code[6], code[7]]) as usize;
        code[8..8 + len].to_vec()
    }

    #[test]
    fn tokens() {
        assert_eq!(
            words_of("  getstatic java/lang/System/out Ljava/io/PrintStream; ; comment"),
            vec!["getstatic", "java/lang/System/out", "Ljava/io/PrintStream;"]
        );
        assert_eq!(
            tokenize(r#"ldc "a \"b\"\t;c\\""#).unwrap(),
            vec![
                Token::Word("ldc".to_owned()),
                Token::Quoted("a \"b\"\t;c\\".to_owned())
            ]
        );
        assert!(words_of("; only a comment").is_empty());
        assert!(tokenize(r#"ldc "open"#).is_err());
        assert!(tokenize(r#"ldc "\q""#).is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_int("-0x10").unwrap(), -16);
        assert_eq!(parse_int("+7").unwrap(), 7);
        assert!(parse_int("99999999999999999999").unwrap_err().is_numeric());
        assert!(!parse_int("x1").unwrap_err().is_numeric());
        assert_eq!(number("2.5").unwrap(), Some(Argument::Float(2.5)));
        assert_eq!(number("java/lang/String").unwrap(), None);
        assert!(number("1.2.3").is_err());
    }

    #[test]
    fn hello_world() {
        let source = r#"
            .class public HelloWorld
            .super java/lang/Object

            .method public static main([Ljava/lang/String;)V
                .limit stack 2
                getstatic java/lang/System/out Ljava/io/PrintStream;
                ldc "Hello, world"
                invokevirtual java/io/PrintStream/println(Ljava/lang/String;)V
                return
            .end method
        "#;
        let class_file = assemble_str(source, Settings::default()).unwrap();
        assert_eq!(class_file.methods.len(), 1);

        let code = code_of(&class_file);
        assert_eq!(code.len(), 9);
        assert_eq!(code[0], 0xb2);
        assert_eq!(code[3], 0x12);
        assert_eq!(code[5], 0xb6);
        assert_eq!(code[8], 0xb1);
    }

    #[test]
    fn switches() {
        let source = "
            .class Switch
            .super java/lang/Object
            .method static f(I)V
                iload_0
                tableswitch 0 1
                    zero
                    one
                    default : other
            zero:
            one:
                iload_0
                lookupswitch
                    1 : other
                    default: other
            other:
                return
            .end method
        ";
        let class_file = assemble_str(source, Settings::default()).unwrap();
        let code = code_of(&class_file);

        // tableswitch at 1: 2 bytes of padding, default, low, high, 2 targets
        assert_eq!(code[1], 0xaa);
        assert_eq!(&code[2..4], &[0, 0]);
        let lookup = 1 + 1 + 2 + 12 + 8 + 1;
        assert_eq!(code[lookup - 1], 0x1a);
        assert_eq!(code[lookup], 0xab);
        assert_eq!(code[code.len() - 1], 0xb1);
    }

    #[test]
    fn fields_and_vars() {
        let source = r#"
            .class public Fields
            .super java/lang/Object
            .field public static final MAX I = 10
            .field static name Ljava/lang/String; = "x"
            .signature "TT;"
            .method public <init>()V
                .var 0 is this LFields; from start to end
                .catch all from start to end using end
            start:
                aload_0
                invokespecial java/lang/Object/<init>()V
            end:
                return
            .end method
        "#;
        let class_file = assemble_str(source, Settings::default()).unwrap();
        assert_eq!(class_file.fields.len(), 2);
        assert_eq!(class_file.fields[0].attributes.len(), 1);
        assert_eq!(class_file.fields[1].attributes.len(), 2);

        // One catch entry, then LocalVariableTable
        let code = &class_file.methods[0].attributes[0].info;
        let handlers = 8 + 5;
        assert_eq!(&code[handlers..handlers + 2], &[0, 1]);
        assert_eq!(&code[handlers + 10..handlers + 12], &[0, 1]);
    }

    #[test]
    fn stack_blocks() {
        let source = "
            .class Frames
            .super java/lang/Object
            .bytecode 50.0
            .method static f(I)V
                iload_0
                ifeq skip
                return
            skip:
                .stack
                    locals Integer
                .end stack
                return
            .end method
        ";
        let class_file = assemble_str(source, Settings::default()).unwrap();
        let code = &class_file.methods[0].attributes[0].info;
        assert_eq!(&code[code.len() - 3..], &[0, 1, 5]);
    }

    #[test]
    fn errors_keep_their_lines() {
        let source = "\
.class Broken
.super java/lang/Object
.method static f()V
    bipush 1000
    frobnicate
    .catch java/lang/Exception from a to b
    goto nowhere
    return
.end method
.bogus
";
        assert_eq!(
            diagnostic_lines(source),
            vec![Some(4), Some(5), Some(6), Some(9), Some(10)]
        );
    }

    #[test]
    fn unterminated_blocks() {
        let source = "
            .class Open
            .super java/lang/Object
            .method static f(I)V
                iload_0
                lookupswitch
                    1 : a
            .end method
        ";
        // The switch is dropped without its default, so its labels are never created
        assert_eq!(diagnostic_lines(source).len(), 1);
    }
}
