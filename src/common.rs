use handlebars::{handlebars_helper, no_escape, Handlebars};

use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_string_to_file(filename: &str, content: &str) -> std::io::Result<()> {
    let path = Path::new(filename);
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// SQL string literal with embedded single quotes doubled
pub fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Handlebars registry for SQL templates: no HTML escaping, plus a
/// `sqlstr` helper that renders a quoted SQL string literal.
pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(no_escape);
    handlebars.set_strict_mode(true);

    handlebars_helper!(sqlstr: |s: String| sql_string(&s));
    handlebars.register_helper("sqlstr", Box::new(sqlstr));

    handlebars
}
