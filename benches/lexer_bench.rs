use criterion::{Criterion, black_box, criterion_group, criterion_main};
use floatlisp::{Environment, execute, tokenize};

const PROGRAM: &str = r#"
(define (fib n)
  (if (< n 2)
      n
      (+ (fib (- n 1))
         (fib (- n 2)))))

(define (factorial n)
  (if (= n 0)
      1
      (* n (factorial (- n 1)))))

(define (average a b) (/ (+ a b) 2))
(define (clamp x lo hi) (if (< x lo) lo (if (> x hi) hi x)))

(fib 10)
(factorial 5)
(average (clamp 12.5 0 10) .5)
(and (>= 3 3) (not (<= 4 1)))
"#;

fn lexer_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize program", |b| {
        b.iter(|| tokenize(black_box(PROGRAM)))
    });
}

fn execute_benchmark(c: &mut Criterion) {
    c.bench_function("execute program", |b| {
        b.iter(|| {
            let env = Environment::new_global_populated();
            execute(black_box(PROGRAM), &env)
        })
    });
}

criterion_group!(benches, lexer_benchmark, execute_benchmark);
criterion_main!(benches);
