//! End-to-end rendering scenarios for the template engine

use pretty_assertions::assert_eq;
use templet::{render_template, Context, Engine, Value};

fn render(source: &str, ctx: &Context) -> String {
    render_template(source, ctx).expect("Should render")
}

#[test]
fn test_tagless_template_is_identity() {
    let source = "plain text, no tags, even { lone braces } survive";
    assert_eq!(render(source, &Context::new()), source);
}

#[test]
fn test_hello_world() {
    let mut ctx = Context::new();
    ctx.insert("name", "World");
    assert_eq!(render("Hello {{ name }}!", &ctx), "Hello World!");
}

#[test]
fn test_conditional_branches() {
    let source = "{% if x %}A{% else %}B{% end %}";

    let mut ctx = Context::new();
    ctx.insert("x", 0);
    assert_eq!(render(source, &ctx), "B");

    let mut ctx = Context::new();
    ctx.insert("x", 1);
    assert_eq!(render(source, &ctx), "A");
}

#[test]
fn test_escape_filter() {
    let mut ctx = Context::new();
    ctx.insert("s", "<a>");
    assert_eq!(render("{{ s | escape }}", &ctx), "&lt;a&gt;");
}

#[test]
fn test_loop_with_index() {
    let mut ctx = Context::new();
    ctx.insert("items", vec![10, 20]);
    assert_eq!(
        render("{% for i in items %}{{ loop.index }}:{{ i }};{% end %}", &ctx),
        "1:10;2:20;"
    );
}

#[test]
fn test_missing_variable_is_falsy() {
    assert_eq!(render("{% if missing %}Y{% end %}", &Context::new()), "");
}

#[test]
fn test_missing_variable_renders_empty() {
    assert_eq!(render("[{{ missing }}]", &Context::new()), "[]");
}

#[test]
fn test_loop_over_non_sequence_is_error() {
    let mut ctx = Context::new();
    ctx.insert("x", 5);
    let result = render_template("{% for i in x %}{{ i }}{% end %}", &ctx);
    assert!(result.is_err());
}

#[test]
fn test_loop_over_missing_renders_nothing() {
    assert_eq!(
        render("{% for i in ghosts %}{{ i }}{% end %}", &Context::new()),
        ""
    );
}

#[test]
fn test_loop_index_law() {
    // Indices are exactly 1..=N
    let mut ctx = Context::new();
    ctx.insert("items", vec!["a", "b", "c", "d"]);
    assert_eq!(
        render("{% for i in items %}{{ loop.index }}{% end %}", &ctx),
        "1234"
    );
}

#[test]
fn test_nested_loops_keep_independent_counters() {
    let mut ctx = Context::new();
    ctx.insert("outer", vec![0, 0]);
    ctx.insert("inner", vec![0, 0, 0]);
    let out = render(
        "{% for a in outer %}{{ loop.index }}({% for b in inner %}{{ loop.index }}{% end %}){% end %}",
        &ctx,
    );
    assert_eq!(out, "1(123)2(123)");
}

#[test]
fn test_loop_first_last_flags() {
    let mut ctx = Context::new();
    ctx.insert("items", vec!["x", "y", "z"]);
    let out = render(
        "{% for i in items %}{% if loop.first %}[{% end %}{{ i }}{% if loop.last %}]{% else %}, {% end %}{% end %}",
        &ctx,
    );
    assert_eq!(out, "[x, y, z]");
}

#[test]
fn test_loop_index0_and_length() {
    let mut ctx = Context::new();
    ctx.insert("items", vec![7, 8]);
    assert_eq!(
        render(
            "{% for i in items %}{{ loop.index0 }}/{{ loop.length }};{% end %}",
            &ctx
        ),
        "0/2;1/2;"
    );
}

#[test]
fn test_scope_restored_after_loop() {
    // The loop variable shadows the global binding only inside the body
    let mut ctx = Context::new();
    ctx.insert("i", "outer");
    ctx.insert("items", vec!["inner"]);
    assert_eq!(
        render("{% for i in items %}{{ i }}{% end %}-{{ i }}", &ctx),
        "inner-outer"
    );
}

#[test]
fn test_loop_variable_undefined_after_loop_without_prior_binding() {
    let mut ctx = Context::new();
    ctx.insert("items", vec!["x"]);
    assert_eq!(
        render("{% for i in items %}{{ i }}{% end %}[{{ i }}]", &ctx),
        "x[]"
    );
}

#[test]
fn test_elif_chain() {
    let source = "{% if a %}A{% elif b %}B{% elif c %}C{% else %}D{% end %}";

    let mut ctx = Context::new();
    ctx.insert("b", true);
    assert_eq!(render(source, &ctx), "B");

    let mut ctx = Context::new();
    ctx.insert("c", true);
    assert_eq!(render(source, &ctx), "C");

    assert_eq!(render(source, &Context::new()), "D");
}

#[test]
fn test_conditional_without_else_renders_nothing() {
    assert_eq!(render("x{% if nope %}Y{% end %}z", &Context::new()), "xz");
}

#[test]
fn test_truthiness_of_empty_containers() {
    let mut ctx = Context::new();
    ctx.insert("empty_text", "");
    ctx.insert("empty_seq", Value::Seq(vec![]));
    ctx.insert("zero", 0.0);
    let source =
        "{% if empty_text %}t{% end %}{% if empty_seq %}s{% end %}{% if zero %}z{% end %}ok";
    assert_eq!(render(source, &ctx), "ok");
}

#[test]
fn test_comments_produce_no_output() {
    let mut ctx = Context::new();
    ctx.insert("x", "value");
    assert_eq!(
        render("a{# this {{ x }} is never evaluated #}b", &ctx),
        "ab"
    );
}

#[test]
fn test_nested_path_access() {
    let ctx = Context::from_serialize(&serde_json::json!({
        "user": { "name": "neo", "tags": ["a", "b"] }
    }))
    .expect("Should convert");
    assert_eq!(
        render("{{ user.name }}/{{ user.tags[1] }}", &ctx),
        "neo/b"
    );
}

#[test]
fn test_loop_over_mappings() {
    let ctx = Context::from_serialize(&serde_json::json!({
        "books": [
            { "rank": 1, "title": "APUE" },
            { "rank": 2, "title": "CSAPP" },
        ]
    }))
    .expect("Should convert");
    let out = render(
        "{% for book in books %}{{ book.rank }}. {{ book.title }}\n{% end %}",
        &ctx,
    );
    assert_eq!(out, "1. APUE\n2. CSAPP\n");
}

#[test]
fn test_filter_pipeline_order() {
    let mut ctx = Context::new();
    ctx.insert("s", "  <b>  ");
    // trim first, then escape: order is left to right
    assert_eq!(render("{{ s | trim | escape }}", &ctx), "&lt;b&gt;");
}

#[test]
fn test_default_filter_on_missing() {
    assert_eq!(
        render(r#"{{ nick | default("anon") }}"#, &Context::new()),
        "anon"
    );
    let mut ctx = Context::new();
    ctx.insert("nick", "neo");
    assert_eq!(render(r#"{{ nick | default("anon") }}"#, &ctx), "neo");
}

#[test]
fn test_default_fallback_is_an_expression() {
    let mut ctx = Context::new();
    ctx.insert("fallback", "from-context");
    assert_eq!(
        render("{{ missing | default(fallback) }}", &ctx),
        "from-context"
    );
}

#[test]
fn test_join_and_length() {
    let mut ctx = Context::new();
    ctx.insert("xs", vec![1, 2, 3]);
    assert_eq!(
        render(r#"{{ xs | join("-") }} has {{ xs | length }}"#, &ctx),
        "1-2-3 has 3"
    );
}

#[test]
fn test_literal_output() {
    assert_eq!(
        render(r#"{{ "quoted" }} {{ 42 }} {{ -3 }} {{ 2.5 }} {{ true }}"#, &Context::new()),
        "quoted 42 -3 2.5 true"
    );
}

#[test]
fn test_null_renders_empty() {
    let mut ctx = Context::new();
    ctx.insert("nothing", Value::Null);
    assert_eq!(render("[{{ nothing }}]", &ctx), "[]");
}

#[test]
fn test_boolean_output_forms() {
    let mut ctx = Context::new();
    ctx.insert("yes", true);
    ctx.insert("no", false);
    assert_eq!(render("{{ yes }}/{{ no }}", &ctx), "true/false");
}

#[test]
fn test_whitespace_and_newlines_preserved() {
    let mut ctx = Context::new();
    ctx.insert("x", "v");
    assert_eq!(render("  {{ x }}\n\t{{ x }}  ", &ctx), "  v\n\tv  ");
}

#[test]
fn test_custom_filter_with_engine() {
    let engine = Engine::new().with_filter("repeat", |value, args: &[Value]| {
        let text = match value {
            Value::Text(s) => s,
            other => {
                return Err(templet::FilterError::WrongType {
                    expected: "text",
                    got: other.kind(),
                })
            }
        };
        let times = match args.first() {
            Some(Value::Number(templet::Number::Int(n))) => *n as usize,
            _ => 2,
        };
        Ok(Value::Text(text.repeat(times)))
    });

    let template = engine
        .compile("{{ word | repeat(3) }}")
        .expect("Should compile");
    let mut ctx = Context::new();
    ctx.insert("word", "ab");
    assert_eq!(template.render(&ctx).expect("renders"), "ababab");
}
