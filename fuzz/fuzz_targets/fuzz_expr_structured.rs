#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vireo_core::{ObservableArray, ObservableObject, Value};
use vireo_expr::{EvalContext, cache_len, clear_cache, compile, compile_statement};

#[derive(Arbitrary, Debug)]
enum Token {
    Ident(u8),
    Number(i16),
    Str(u8),
    Dot,
    Index(u8),
    Op(u8),
    Not,
    Paren(Vec<Token>),
    Call(Vec<Token>),
    Ternary,
    Assign,
    Semicolon,
}

const IDENTS: [&str; 6] = ["a", "b", "list", "obj", "$event", "$global"];
const OPS: [&str; 14] = [
    "+", "-", "*", "/", "%", "==", "===", "!=", "<", ">=", "&&", "||", "+=", "??",
];

impl Token {
    fn write(&self, out: &mut String, depth: u8) {
        match self {
            Token::Ident(i) => out.push_str(IDENTS[usize::from(*i) % IDENTS.len()]),
            Token::Number(n) => out.push_str(&n.to_string()),
            Token::Str(c) => {
                out.push('\'');
                out.push(char::from(b'a' + c % 26));
                out.push('\'');
            }
            Token::Dot => out.push('.'),
            Token::Index(i) => out.push_str(&format!("[{}]", i % 4)),
            Token::Op(o) => out.push_str(OPS[usize::from(*o) % OPS.len()]),
            Token::Not => out.push('!'),
            Token::Paren(inner) | Token::Call(inner) => {
                if matches!(self, Token::Call(_)) {
                    out.push_str("obj.f");
                }
                out.push('(');
                if depth < 8 {
                    for token in inner {
                        token.write(out, depth + 1);
                    }
                }
                out.push(')');
            }
            Token::Ternary => out.push_str(" ? "),
            Token::Assign => out.push_str(" = "),
            Token::Semicolon => out.push(';'),
        }
    }
}

fuzz_target!(|tokens: Vec<Token>| {
    if tokens.len() > 64 {
        return;
    }
    if cache_len() > 4096 {
        clear_cache();
    }
    let mut text = String::new();
    for token in &tokens {
        token.write(&mut text, 0);
    }

    let scope = Value::Object(ObservableObject::from_entries([
        ("a", Value::from(2)),
        ("b", Value::from("z")),
        (
            "list",
            Value::Array([1, 2, 3].into_iter().map(Value::from).collect::<ObservableArray>()),
        ),
        ("obj", Value::Object(ObservableObject::new())),
    ]));
    let ctx = EvalContext::new(scope).with_event(Value::from(7));
    let _ = compile(&text).call(&ctx);
    let _ = compile_statement(&text).call(&ctx);
});
