// ABOUTME: End-to-end tests driving source text through the full pipeline

use lispy::builtins::global_env;
use lispy::env::Environment;
use lispy::error::Error;
use lispy::run_source;
use lispy::value::Value;
use std::sync::Arc;

fn setup() -> Arc<Environment> {
    global_env()
}

fn eval_ok(env: &Arc<Environment>, source: &str) -> Value {
    run_source(source, env).unwrap_or_else(|e| panic!("{} failed: {}", source, e))
}

fn eval_err(env: &Arc<Environment>, source: &str) -> Error {
    match run_source(source, env) {
        Ok(value) => panic!("{} unexpectedly evaluated to {}", source, value.repr()),
        Err(e) => e,
    }
}

#[test]
fn test_arithmetic_basics() {
    let env = setup();
    assert_eq!(eval_ok(&env, "(+ 1 2 3)"), Value::Int(6));
    assert_eq!(eval_ok(&env, "(- 10 3 2)"), Value::Int(5));
    assert_eq!(eval_ok(&env, "(* 2 3 4)"), Value::Int(24));
    assert_eq!(eval_ok(&env, "(/ 9 2)"), Value::Float(4.5));
    assert_eq!(eval_ok(&env, "(% 10 3)"), Value::Int(1));
}

#[test]
fn test_immediate_lambda_application() {
    let env = setup();
    assert_eq!(eval_ok(&env, "((fn [x] (* x x)) 7)"), Value::Int(49));
}

#[test]
fn test_loop_recur_factorial() {
    let env = setup();
    assert_eq!(
        eval_ok(
            &env,
            "(loop [n 5 acc 1] (if (<= n 1) acc (recur (- n 1) (* acc n))))"
        ),
        Value::Int(120)
    );
}

#[test]
fn test_thread_first_pipeline() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(-> [1 2 3] (conj 4) reverse)"),
        Value::Vector(vec![
            Value::Int(4),
            Value::Int(3),
            Value::Int(2),
            Value::Int(1),
        ])
    );
}

#[test]
fn test_thread_last_pipeline() {
    let env = setup();
    // (->> 10 (- 100) (* 2)) => (* 2 (- 100 10)) => 180
    assert_eq!(eval_ok(&env, "(->> 10 (- 100) (* 2))"), Value::Int(180));
    assert_eq!(
        eval_ok(&env, "(->> [1 2 3 4] (filter (fn [x] (> x 1))) (map (fn [x] (* x 10))))"),
        Value::Vector(vec![Value::Int(20), Value::Int(30), Value::Int(40)])
    );
}

#[test]
fn test_try_catch_binds_thrown_payload() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(try (throw \"oops\") (catch e e))"),
        Value::Str("oops".to_string())
    );
}

#[test]
fn test_try_catch_ignores_assertion_failures() {
    let env = setup();
    let err = eval_err(&env, "(try (assert-true? false) (catch e \"caught\"))");
    assert!(matches!(err, Error::Assertion(_)));
}

#[test]
fn test_try_without_error_returns_body_value() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(try (+ 1 2) (catch e \"unused\"))"),
        Value::Int(3)
    );
}

#[test]
fn test_recur_countdown_at_depth() {
    let env = setup();
    eval_ok(
        &env,
        "(defn c [n] (if (<= n 0) :done (recur (- n 1))))",
    );
    assert_eq!(
        eval_ok(&env, "(c 10000)"),
        Value::Symbol(":done".to_string())
    );
}

#[test]
fn test_non_tail_self_call_hits_recursion_limit() {
    let env = setup();
    eval_ok(
        &env,
        "(defn deep [n] (if (<= n 0) 0 (deep (- n 1))))",
    );
    let err = eval_err(&env, "(deep 200)");
    match err {
        Error::Recursion(message) => assert!(message.contains("recur")),
        other => panic!("Expected recursion error, got {}", other),
    }
}

#[test]
fn test_recur_arity_must_match() {
    let env = setup();
    eval_ok(&env, "(defn f [a b] (recur a))");
    assert!(matches!(eval_err(&env, "(f 1 2)"), Error::Arity(_)));
}

#[test]
fn test_recur_outside_function_is_an_error() {
    let env = setup();
    assert!(matches!(eval_err(&env, "(recur 1)"), Error::Evaluation(_)));
}

#[test]
fn test_short_circuit_and_or() {
    let env = setup();
    // (and false e) never evaluates e; verifiable with throw
    assert_eq!(
        eval_ok(&env, "(and false (throw \"never\"))"),
        Value::Bool(false)
    );
    assert_eq!(
        eval_ok(&env, "(or true (throw \"never\"))"),
        Value::Bool(true)
    );
    assert!(matches!(
        eval_err(&env, "(and true (throw \"reached\"))"),
        Error::Thrown(_)
    ));

    assert_eq!(eval_ok(&env, "(and)"), Value::Bool(true));
    assert_eq!(eval_ok(&env, "(or)"), Value::Nil);
    assert_eq!(eval_ok(&env, "(and 1 2 3)"), Value::Int(3));
    assert_eq!(eval_ok(&env, "(or nil false 7)"), Value::Int(7));
    assert_eq!(eval_ok(&env, "(or nil false)"), Value::Bool(false));
}

#[test]
fn test_truthiness_only_nil_and_false_are_falsy() {
    let env = setup();
    assert_eq!(eval_ok(&env, "(if 0 \"t\" \"f\")"), Value::Str("t".to_string()));
    assert_eq!(eval_ok(&env, "(if \"\" \"t\" \"f\")"), Value::Str("t".to_string()));
    assert_eq!(eval_ok(&env, "(if [] \"t\" \"f\")"), Value::Str("t".to_string()));
    assert_eq!(eval_ok(&env, "(if nil \"t\" \"f\")"), Value::Str("f".to_string()));
    assert_eq!(eval_ok(&env, "(if false \"t\")"), Value::Nil);
}

#[test]
fn test_cond_clauses() {
    let env = setup();
    assert_eq!(
        eval_ok(
            &env,
            "(define classify (fn [n] (cond (< n 0) \"neg\" (= n 0) \"zero\" true \"pos\"))) (classify -3)"
        ),
        Value::Str("neg".to_string())
    );
    assert_eq!(eval_ok(&env, "(classify 0)"), Value::Str("zero".to_string()));
    assert_eq!(eval_ok(&env, "(classify 9)"), Value::Str("pos".to_string()));
    assert_eq!(eval_ok(&env, "(cond false 1)"), Value::Nil);
    assert!(matches!(eval_err(&env, "(cond false)"), Error::Evaluation(_)));
}

#[test]
fn test_let_binds_sequentially() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(let [a 2 b (* a 3)] (+ a b))"),
        Value::Int(8)
    );
    // bindings stay local
    assert!(matches!(eval_err(&env, "a"), Error::UnboundSymbol(_)));
}

#[test]
fn test_closures_capture_their_environment() {
    let env = setup();
    eval_ok(
        &env,
        "(define make-adder (fn [n] (fn [x] (+ x n)))) (define add5 (make-adder 5))",
    );
    assert_eq!(eval_ok(&env, "(add5 3)"), Value::Int(8));
}

#[test]
fn test_do_and_doseq() {
    let env = setup();
    assert_eq!(eval_ok(&env, "(do 1 2 3)"), Value::Int(3));
    assert_eq!(eval_ok(&env, "(do)"), Value::Nil);

    // doseq is side effects only and returns nil
    assert_eq!(
        eval_ok(
            &env,
            "(define total 0) (doseq [x [1 2 3]] (define total (+ total x)))"
        ),
        Value::Nil
    );
}

#[test]
fn test_quote_prevents_evaluation() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "'(+ 1 2)"),
        Value::List(vec![
            Value::Symbol("+".to_string()),
            Value::Int(1),
            Value::Int(2),
        ])
    );
    assert_eq!(
        eval_ok(&env, "(quote x)"),
        Value::Symbol("x".to_string())
    );
}

#[test]
fn test_empty_call_is_an_error() {
    let env = setup();
    assert!(matches!(eval_err(&env, "()"), Error::Evaluation(_)));
}

#[test]
fn test_unbound_symbol_error() {
    let env = setup();
    assert!(matches!(
        eval_err(&env, "definitely-not-bound"),
        Error::UnboundSymbol(_)
    ));
}

#[test]
fn test_map_literal_evaluates_values() {
    let env = setup();
    eval_ok(&env, "(define x 41)");
    assert_eq!(
        eval_ok(&env, "(get {:a (+ x 1)} :a)"),
        Value::Int(42)
    );
}

#[test]
fn test_map_operations() {
    let env = setup();
    eval_ok(&env, "(define m {:a 1 :b 2})");
    assert_eq!(eval_ok(&env, "(get m :a)"), Value::Int(1));
    assert_eq!(eval_ok(&env, "(get m :zz 99)"), Value::Int(99));
    assert_eq!(eval_ok(&env, "(get (assoc m :c 3) :c)"), Value::Int(3));
    assert_eq!(eval_ok(&env, "(count (dissoc m :a))"), Value::Int(1));
    assert_eq!(
        eval_ok(&env, "(get (merge m {:b 20}) :b)"),
        Value::Int(20)
    );
    assert_eq!(eval_ok(&env, "(count (keys m))"), Value::Int(2));
}

#[test]
fn test_numeric_map_keys_unify_int_and_float() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(get (hash-map 1 \"one\") 1.0)"),
        Value::Str("one".to_string())
    );
}

#[test]
fn test_collection_pipeline() {
    let env = setup();
    assert_eq!(
        eval_ok(
            &env,
            "(reduce (fn [acc x] (+ acc x)) 0 (map (fn [x] (* x x)) [1 2 3 4]))"
        ),
        Value::Int(30)
    );
    assert_eq!(
        eval_ok(&env, "(filter (fn [x] (> x 2)) '(1 2 3 4 5))"),
        Value::List(vec![Value::Int(3), Value::Int(4), Value::Int(5)])
    );
    assert_eq!(eval_ok(&env, "(some (fn [x] (> x 3)) [1 4 2])"), Value::Bool(true));
    assert_eq!(eval_ok(&env, "(every? (fn [x] (> x 0)) [1 2])"), Value::Bool(true));
}

#[test]
fn test_json_round_trip_scenario() {
    let env = setup();
    assert_eq!(
        eval_ok(
            &env,
            "(= (json-decode (json-encode {:a [1 2] :b nil})) {:a [1 2] :b nil})"
        ),
        Value::Bool(true)
    );
}

#[test]
fn test_json_decode_object_keys_are_keywords() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(get (json-decode \"{\\\"name\\\": \\\"Ada\\\"}\") :name)"),
        Value::Str("Ada".to_string())
    );
}

#[test]
fn test_string_builtins() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(str \"n=\" 42)"),
        Value::Str("n=42".to_string())
    );
    assert_eq!(
        eval_ok(&env, "(join \"-\" (split \"a,b,c\" \",\"))"),
        Value::Str("a-b-c".to_string())
    );
}

#[test]
fn test_type_predicates_and_conversions() {
    let env = setup();
    assert_eq!(eval_ok(&env, "(is-number? 1.5)"), Value::Bool(true));
    assert_eq!(eval_ok(&env, "(is-vector? [1])"), Value::Bool(true));
    assert_eq!(eval_ok(&env, "(is-map? {:a 1})"), Value::Bool(true));
    assert_eq!(eval_ok(&env, "(is-function? (fn [] 1))"), Value::Bool(true));
    assert_eq!(eval_ok(&env, "(to-int \"42\")"), Value::Int(42));
    assert_eq!(eval_ok(&env, "(to-str [1 2])"), Value::Str("[1 2]".to_string()));
}

#[test]
fn test_print_round_trip_of_values() {
    // eval(parse(print(v))) = v for printable values
    let env = setup();
    for source in ["42", "2.5", "\"hi\"", "true", "nil", "[1 [2 3]]", "{:a 1}"] {
        let value = eval_ok(&env, source);
        let reparsed = eval_ok(&env, &value.repr());
        assert_eq!(value, reparsed, "round trip failed for {}", source);
    }
}

#[test]
fn test_vectors_are_self_evaluating() {
    let env = setup();
    // elements are not evaluated
    assert_eq!(
        eval_ok(&env, "(first [unbound-name])"),
        Value::Symbol("unbound-name".to_string())
    );
}

#[test]
fn test_division_by_zero_kind() {
    let env = setup();
    assert!(matches!(eval_err(&env, "(/ 1 0)"), Error::ZeroDivision));
    assert!(matches!(eval_err(&env, "(% 1 0)"), Error::ZeroDivision));
}

#[test]
fn test_nth_out_of_bounds_kind() {
    let env = setup();
    assert!(matches!(eval_err(&env, "(nth [1 2] 5)"), Error::Index(_)));
}

#[test]
fn test_not_callable_kind() {
    let env = setup();
    assert!(matches!(eval_err(&env, "(1 2 3)"), Error::Evaluation(_)));
}

#[test]
fn test_lexer_and_parse_error_kinds_surface() {
    let env = setup();
    assert!(matches!(eval_err(&env, "\"bad\\q\""), Error::Lexer(_)));
    assert!(matches!(eval_err(&env, "(+ 1"), Error::Parse(_)));
    assert!(matches!(eval_err(&env, "{:a}"), Error::Parse(_)));
}

#[test]
fn test_comments_and_commas_in_source() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "; a comment\n(+ 1, 2, 3) ; trailing"),
        Value::Int(6)
    );
}

#[test]
fn test_multiple_top_level_forms_return_last() {
    let env = setup();
    assert_eq!(
        eval_ok(&env, "(define a 1) (define b 2) (+ a b)"),
        Value::Int(3)
    );
}
