//! Differential tests: the tree-walking and compiled-pipeline backends must
//! produce byte-identical output for every template and context.

use templet::{Backend, Context, Engine, Value};

fn contexts() -> Vec<Context> {
    let mut rich = Context::new();
    rich.insert("name", "neo");
    rich.insert("msg", "Keep calm and carry on!");
    rich.insert("items", vec![10, 20, 30]);
    rich.insert("flag", true);
    rich.insert("zero", 0);
    rich.insert("html", "<b>&\"bold\"</b>");

    let nested = Context::from_serialize(&serde_json::json!({
        "name": "trinity",
        "items": [1],
        "flag": false,
        "zero": 1,
        "html": "",
        "books": [
            { "rank": 1, "title": "APUE" },
            { "rank": 2, "title": "SICP" },
        ],
        "library": { "books": ["a", "b"] },
    }))
    .expect("Should convert");

    vec![rich, nested, Context::new()]
}

fn templates() -> Vec<&'static str> {
    vec![
        "no tags at all",
        "Hello {{ name }}!",
        "{{ name | default(\"anon\") | upper }}",
        "{{ html | escape }}",
        "{% if flag %}yes{% else %}no{% end %}",
        "{% if zero %}nonzero{% end %}",
        "{% if missing %}never{% elif flag %}elif{% else %}else{% end %}",
        "{% for i in items %}{{ loop.index }}={{ i }};{% end %}",
        "{% for i in items %}{% if loop.first %}<{% end %}{{ i }}{% if loop.last %}>{% else %},{% end %}{% end %}",
        "{% for i in absent %}{{ i }}{% end %}done",
        "{% for a in items %}{% for b in items %}{{ loop.index0 }}{% end %}|{% end %}",
        "{{ items | length }} items, first {{ items | first }}, last {{ items | last }}",
        "{{ items | join(\", \") }}",
        "{# comment #}text{# another #}",
        "{% for i in items %}{{ i }}{% end %}{{ i }}",
        "literal {{ 'text' }} and {{ 42 }} and {{ true }} and {{ null }}",
    ]
}

#[test]
fn test_backends_identical_over_corpus() {
    let engine = Engine::new();
    for source in templates() {
        let template = engine
            .compile(source)
            .unwrap_or_else(|e| panic!("Should compile {source:?}: {e}"));
        let program = template.program();
        for (i, ctx) in contexts().iter().enumerate() {
            let walked = template.render(ctx);
            let piped = program.render(ctx);
            match (walked, piped) {
                (Ok(a), Ok(b)) => {
                    assert_eq!(a, b, "outputs diverge for {source:?} with context #{i}")
                }
                (Err(a), Err(b)) => {
                    // Both must fail the same way
                    assert_eq!(
                        a.to_string(),
                        b.to_string(),
                        "errors diverge for {source:?} with context #{i}"
                    );
                }
                (walked, piped) => panic!(
                    "one backend failed for {source:?} with context #{i}: walk={walked:?} pipeline={piped:?}"
                ),
            }
        }
    }
}

#[test]
fn test_backends_identical_on_render_errors() {
    let engine = Engine::new();
    let mut ctx = Context::new();
    ctx.insert("scalar", 7);
    ctx.insert("seq", vec![1, 2]);

    for source in [
        "{% for i in scalar %}x{% end %}",
        "{{ seq }}",
        "{{ ghost.field }}",
        "{{ ghost | upper }}",
        "{{ scalar | upper }}",
    ] {
        let template = engine.compile(source).expect("Should compile");
        let walked = template
            .render_with(Backend::TreeWalking, &ctx)
            .expect_err("walk should fail");
        let piped = template
            .render_with(Backend::CompiledPipeline, &ctx)
            .expect_err("pipeline should fail");
        assert_eq!(walked.to_string(), piped.to_string(), "for {source:?}");
    }
}

#[test]
fn test_program_does_not_leak_state_between_renders() {
    let template = Engine::new()
        .compile("{% for i in items %}{{ i }}{% end %}")
        .expect("Should compile");
    let program = template.program();

    let mut first = Context::new();
    first.insert("items", vec![1, 2]);
    let mut second = Context::new();
    second.insert("items", vec![9]);

    assert_eq!(program.render(&first).expect("renders"), "12");
    assert_eq!(program.render(&second).expect("renders"), "9");
    assert_eq!(program.render(&first).expect("renders"), "12");
}
