// SQL text preparation for the Postgres driver.
use crate::error::{DatabaseError, DatabaseResult};
use crate::params::TypedParam;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// SQL with positional placeholders and the parameters in bind order
#[derive(Debug)]
pub struct PreparedSql<'p> {
    pub sql: String,
    pub binds: Vec<&'p TypedParam>,
}

/// Rewrite `@name` placeholders to `$n`.
///
/// Placeholders inside quotes and comments are left alone, as are `@@`
/// server variables. Repeated names reuse their first position. Supplied
/// parameters the text never mentions are not bound.
///
/// # Errors
///
/// A placeholder with no matching parameter.
pub fn rewrite_named_parameters<'p>(sql: &str, params: &'p [TypedParam]) -> DatabaseResult<PreparedSql<'p>> {
    let mut out = String::with_capacity(sql.len());
    let mut binds: Vec<&'p TypedParam> = Vec::new();
    let mut state = Lexeme::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Lexeme::Code => match c {
                '\'' => state = Lexeme::SingleQuoted,
                '"' => state = Lexeme::DoubleQuoted,
                '-' if chars.peek() == Some(&'-') => state = Lexeme::LineComment,
                '/' if chars.peek() == Some(&'*') => state = Lexeme::BlockComment,
                '@' if chars.peek() == Some(&'@') => {
                    out.push(c);
                    while let Some(&next) = chars.peek() {
                        if next != '@' && !is_identifier_char(next) {
                            break;
                        }
                        out.push(next);
                        chars.next();
                    }
                    continue;
                }
                '@' if chars.peek().is_some_and(|n| is_identifier_start(*n)) => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !is_identifier_char(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }

                    let position = match binds.iter().position(|p| p.name.eq_ignore_ascii_case(&name)) {
                        Some(index) => index,
                        None => {
                            let param = params
                                .iter()
                                .find(|p| p.name.eq_ignore_ascii_case(&name))
                                .ok_or_else(|| {
                                    DatabaseError::QueryFailed(format!(
                                        "Must declare the scalar variable \"@{name}\"."
                                    ))
                                })?;
                            binds.push(param);
                            binds.len() - 1
                        }
                    };
                    out.push('$');
                    out.push_str(&(position + 1).to_string());
                    continue;
                }
                _ => {}
            },
            Lexeme::SingleQuoted if c == '\'' => state = Lexeme::Code,
            Lexeme::DoubleQuoted if c == '"' => state = Lexeme::Code,
            Lexeme::LineComment if c == '\n' => state = Lexeme::Code,
            Lexeme::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                out.push(c);
                if let Some(slash) = chars.next() {
                    out.push(slash);
                }
                state = Lexeme::Code;
                continue;
            }
            _ => {}
        }
        out.push(c);
    }

    Ok(PreparedSql { sql: out, binds })
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}

/// `name` or `schema.name`
pub fn is_procedure_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((schema, object)) => is_identifier(schema) && is_identifier(object),
        None => is_identifier(name),
    }
}

/// Build a named-notation function call: `SELECT * FROM proc(arg => $1, ...)`.
///
/// # Errors
///
/// The procedure or a parameter name is not a plain identifier.
pub fn procedure_call(name: &str, params: &[TypedParam]) -> DatabaseResult<String> {
    if !is_procedure_name(name) {
        return Err(DatabaseError::QueryFailed(format!(
            "Could not find stored procedure '{name}'."
        )));
    }

    let mut args = Vec::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
        if !is_identifier(&param.name) {
            return Err(DatabaseError::invalid_parameter(
                &param.name,
                "not a valid argument name",
            ));
        }
        args.push(format!("{} => ${}", param.name, index + 1));
    }

    Ok(format!("SELECT * FROM {name}({})", args.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamValue, SqlType};

    fn text(name: &str) -> TypedParam {
        TypedParam::new(name, SqlType::Text, ParamValue::Text("v".into()))
    }

    #[test]
    fn test_rewrites_in_order_of_first_use() {
        let params = vec![text("b"), text("a")];
        let prepared = rewrite_named_parameters(
            "SELECT * FROM t WHERE a = @a AND b = @B OR a2 = @a",
            &params,
        )
        .unwrap();
        assert_eq!(prepared.sql, "SELECT * FROM t WHERE a = $1 AND b = $2 OR a2 = $1");
        assert_eq!(prepared.binds[0].name, "a");
        assert_eq!(prepared.binds[1].name, "b");
    }

    #[test]
    fn test_leaves_quotes_comments_and_server_variables() {
        let params = vec![text("id")];
        let sql = "SELECT '@id', \"@id\", @@VERSION -- @id\n/* @id */ FROM t WHERE x = @id";
        let prepared = rewrite_named_parameters(sql, &params).unwrap();
        assert_eq!(
            prepared.sql,
            "SELECT '@id', \"@id\", @@VERSION -- @id\n/* @id */ FROM t WHERE x = $1"
        );
    }

    #[test]
    fn test_operators_are_not_placeholders() {
        let prepared = rewrite_named_parameters("SELECT tags @> '{a}' FROM t", &[]).unwrap();
        assert_eq!(prepared.sql, "SELECT tags @> '{a}' FROM t");
        assert!(prepared.binds.is_empty());
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let err = rewrite_named_parameters("SELECT @missing", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Must declare the scalar variable \"@missing\".");
    }

    #[test]
    fn test_procedure_call() {
        let params = vec![text("username"), text("password")];
        assert_eq!(
            procedure_call("dbo.usp_sys_login_validation", &params).unwrap(),
            "SELECT * FROM dbo.usp_sys_login_validation(username => $1, password => $2)"
        );
        assert_eq!(procedure_call("refresh", &[]).unwrap(), "SELECT * FROM refresh()");
    }

    #[test]
    fn test_procedure_call_rejects_injection() {
        assert!(procedure_call("x; DROP TABLE users", &[]).is_err());
        assert!(procedure_call("a.b.c", &[]).is_err());
        assert!(procedure_call("ok", &[text("bad name")]).is_err());
    }
}
