//! Member-function sub-parser for interface classes.
//!
//! Runs token by token with an explicit state: return type, method name,
//! argument list, trailer, or the inside of an attribute's parenthesized
//! value. The state survives across lines so declarations may wrap.

use crate::model::{Arg, ArgAttribute, Function, FunctionAttribute, Parser};
use crate::parser::FileState;
use crate::schema::markers::{ARG_ATTRIBUTES, FUNC_ATTRIBUTES};
use crate::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FuncState {
    #[default]
    Return,
    Name,
    Args,
    Trailer,
    AttrValue,
}

impl Parser {
    /// Collects attribute macros standing on their own line before a
    /// function declaration.
    fn scan_function_attributes(&mut self, st: &mut FileState, line: &str) {
        for name in FUNC_ATTRIBUTES {
            if !line.starts_with(*name) {
                continue;
            }
            if let (Some(open), Some(close)) = (line.find('('), line.rfind(')'))
                && close > open
            {
                st.pending_fn_attrs.push(FunctionAttribute {
                    name: line[..open].to_string(),
                    value: line[open + 1..close].trim().to_string(),
                });
            }
        }
    }

    pub(crate) fn parse_interface_functions(&mut self, st: &mut FileState, raw_line: &str) {
        self.scan_function_attributes(st, raw_line);

        let mut line = raw_line.to_string();
        if line.starts_with("STEAM_PRIVATE_API") {
            st.in_private = true;
            if let Some(p) = line.find('(') {
                line = line[p + 1..].trim().to_string();
            }
        }
        let entered_private = st.in_private;
        if st.in_private && line.ends_with(')') {
            st.in_private = false;
            line.pop();
            line.truncate(line.trim_end().len());
        }

        // Only `virtual`/`inline` can open a declaration, but a declaration
        // in progress keeps consuming lines.
        if st.function.is_none() && !(line.starts_with("virtual") || line.starts_with("inline")) {
            return;
        }
        if line.contains('~') {
            return;
        }

        if st.function.is_none() {
            let mut func = Function::default();
            if st.pre.if_depth() > 1 {
                func.guard = st.pre.top_if().map(str::to_string);
            }
            func.private = entered_private;
            func.attributes = std::mem::take(&mut st.pending_fn_attrs);
            func.comment = st.scrub.consume();
            st.function = Some(func);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mut i = 0usize;
        while i < tokens.len() {
            let mut token: String = tokens[i].to_string();

            if st.func_state == FuncState::Return {
                if token == "virtual" || token == "inline" {
                    i += 1;
                    continue;
                }
                let func = st.function.as_mut().unwrap();
                if token.starts_with('*') {
                    func.return_type.push('*');
                    token.replace_range(..1, "");
                    st.func_state = FuncState::Name;
                } else if token.contains('(') {
                    func.return_type = func.return_type.trim().to_string();
                    st.func_state = FuncState::Name;
                } else {
                    func.return_type.push_str(&token);
                    func.return_type.push(' ');
                    i += 1;
                    continue;
                }
            }

            if st.func_state == FuncState::Name {
                st.function.as_mut().unwrap().name =
                    token.split('(').next().unwrap_or("").to_string();
                if token.ends_with(')') {
                    st.func_state = FuncState::Trailer;
                    // fall through: a `);`-style token must still close
                } else if token.ends_with(';') {
                    Self::finish_function(st);
                    break;
                } else if !token.ends_with('(') {
                    if self.settings.contains(Settings::WARN_SPACING) {
                        self.diags.warn(
                            &st.file.name,
                            st.line_num,
                            &line,
                            "function is missing whitespace between the opening parentheses and first arg",
                        );
                    }
                    match token.find('(') {
                        Some(pos) => {
                            token = token[pos + 1..].to_string();
                            st.func_state = FuncState::Args;
                        }
                        None => {
                            st.func_state = FuncState::Args;
                            i += 1;
                            continue;
                        }
                    }
                } else {
                    st.func_state = FuncState::Args;
                    i += 1;
                    continue;
                }
            }

            if st.func_state == FuncState::Args {
                if ARG_ATTRIBUTES.iter().any(|a| token.starts_with(*a)) {
                    let mut attr = ArgAttribute::default();
                    match token.find('(') {
                        Some(open) => {
                            attr.name = token[..open].to_string();
                            if token.len() > open + 1 {
                                if token.ends_with(')') {
                                    attr.value = token[open + 1..token.len() - 1].to_string();
                                    st.func_attr = Some(attr);
                                    i += 1;
                                    continue;
                                }
                                attr.value = token[open + 1..].to_string();
                            }
                        }
                        None => attr.name = token.clone(),
                    }
                    st.func_attr = Some(attr);
                    st.func_state = FuncState::AttrValue;
                    i += 1;
                    continue;
                }

                if token.starts_with("**") {
                    st.func_args.push_str("**");
                    token.replace_range(..2, "");
                } else if token.starts_with('*') || token.starts_with('&') {
                    st.func_args.push_str(&token[..1]);
                    token.replace_range(..1, "");
                }
                if token.is_empty() {
                    i += 1;
                    continue;
                }

                if token.starts_with(')') {
                    if !st.func_args.is_empty()
                        && let Some(&prev) = i.checked_sub(1).and_then(|p| tokens.get(p))
                    {
                        let arg = close_arg(&st.func_args, prev, &mut st.func_attr, true);
                        st.function.as_mut().unwrap().args.push(arg);
                        st.func_args.clear();
                    }
                    st.func_state = FuncState::Trailer;
                    if token.ends_with(';') {
                        Self::finish_function(st);
                        break;
                    }
                } else if token.ends_with(')') {
                    if self.settings.contains(Settings::WARN_SPACING) {
                        self.diags.warn(
                            &st.file.name,
                            st.line_num,
                            &line,
                            "function is missing whitespace between the closing parentheses and last arg",
                        );
                    }
                    let arg = Arg {
                        name: token[..token.len() - 1].to_string(),
                        ctype: st.func_args.trim().to_string(),
                        default: None,
                        attribute: st.func_attr.take(),
                    };
                    st.function.as_mut().unwrap().args.push(arg);
                    st.func_args.clear();
                    st.func_state = FuncState::Trailer;
                } else if token.ends_with(',') {
                    let body = &token[..token.len() - 1];
                    let skip = usize::from(body.contains('*') || body.contains('&'));
                    let arg = Arg {
                        name: body.get(skip..).unwrap_or("").to_string(),
                        ctype: st.func_args.trim().to_string(),
                        default: None,
                        attribute: st.func_attr.take(),
                    };
                    st.function.as_mut().unwrap().args.push(arg);
                    st.func_args.clear();
                } else if token == "=" {
                    if let Some(&prev) = i.checked_sub(1).and_then(|p| tokens.get(p)) {
                        let mut arg = close_arg(&st.func_args, prev, &mut st.func_attr, false);
                        arg.default = tokens.get(i + 1).map(|t| t.trim_end_matches(',').to_string());
                        st.function.as_mut().unwrap().args.push(arg);
                        st.func_args.clear();
                        i += 1; // the default token is consumed
                    }
                } else {
                    st.func_args.push_str(&token);
                    st.func_args.push(' ');
                }
                i += 1;
                continue;
            }

            if st.func_state == FuncState::Trailer {
                if token.ends_with(';') {
                    Self::finish_function(st);
                    break;
                }
                i += 1;
                continue;
            }

            if st.func_state == FuncState::AttrValue {
                let Some(attr) = st.func_attr.as_mut() else {
                    st.func_state = FuncState::Args;
                    continue;
                };
                if token.ends_with(')') {
                    attr.value.push_str(&token[..token.len() - 1]);
                    st.func_state = FuncState::Args;
                } else {
                    attr.value.push_str(&token);
                }
                i += 1;
                continue;
            }

            i += 1;
        }
    }

    fn finish_function(st: &mut FileState) {
        if let (Some(func), Some(interface)) = (st.function.take(), st.interface.as_mut()) {
            interface.functions.push(func);
        }
        st.func_state = FuncState::Return;
    }
}

/// Closes the argument whose name was the previous token.
///
/// Pointer and reference sigils were folded into the accumulated type text
/// when the name token was first seen, so the name is recovered from the
/// previous raw token minus its sigils, and the type text is the
/// accumulator minus that trailing name.
fn close_arg(args: &str, prev: &str, attr: &mut Option<ArgAttribute>, allow_double: bool) -> Arg {
    let mut trailing = 1i32;
    let mut sigils = 0usize;
    if allow_double && prev.contains("**") {
        trailing -= 2;
        sigils = 2;
    } else if prev.contains('*') || prev.contains('&') {
        trailing -= 1;
        sigils = 1;
    }
    let cut = (args.len() as i32 - prev.len() as i32 - trailing).max(0) as usize;
    Arg {
        name: prev.get(sigils..).unwrap_or("").to_string(),
        ctype: args.get(..cut).unwrap_or("").trim().to_string(),
        default: None,
        attribute: attr.take(),
    }
}
