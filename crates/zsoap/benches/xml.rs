use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use zsoap::from_str;

const SIMPLE_XML: &str = "<root><child>text</child></root>";
const NAMESPACED_XML: &str = "<ns1:root xmlns:ns1=\"urn:a\" xmlns=\"urn:b\">\
    <ns1:item id=\"1\">one</ns1:item><item id=\"2\">two &amp; three</item></ns1:root>";

fn bench_simple(c: &mut Criterion) {
    c.bench_function("zsoap_xml_simple", |b| {
        b.iter(|| from_str(black_box(SIMPLE_XML)))
    });
}

fn bench_namespaced(c: &mut Criterion) {
    c.bench_function("zsoap_xml_namespaced", |b| {
        b.iter(|| from_str(black_box(NAMESPACED_XML)))
    });
}

fn bench_serialize(c: &mut Criterion) {
    let Ok(tree) = from_str(NAMESPACED_XML) else {
        return;
    };
    c.bench_function("zsoap_xml_serialize", |b| {
        b.iter(|| black_box(&tree).to_xml_string())
    });
}

criterion_group!(benches, bench_simple, bench_namespaced, bench_serialize);
criterion_main!(benches);
