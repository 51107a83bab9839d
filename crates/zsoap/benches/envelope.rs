use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use zsoap::{Catalog, Client, Config, Message, Object, Operation, Schema, Struct, Value};

const MULTIREF_RESPONSE: &str = "<soapenv:Envelope \
    xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
    <soapenv:Body><ns1:queryResponse xmlns:ns1=\"urn:bench\">\
    <queryReturn href=\"#id0\"/></ns1:queryResponse>\
    <multiRef id=\"id0\"><statusCode>OK</statusCode><total>3</total>\
    <rows><item>a</item><item>b</item><item>c</item></rows></multiRef>\
    </soapenv:Body></soapenv:Envelope>";

fn catalog() -> Arc<Catalog> {
    let input = Message::new(
        "query",
        Struct::new()
            .field("filter", Struct::new().field("kind", Schema::string()).field("limit", Schema::int()))
            .optional("cursor", Schema::string()),
    );
    let output = Message::new(
        "queryResponse",
        Struct::new().field(
            "queryReturn",
            Struct::new()
                .field("statusCode", Schema::string())
                .field("total", Schema::int())
                .field("rows", Schema::list(Schema::string())),
        ),
    );
    Arc::new(
        Catalog::new()
            .with_namespace("urn:bench")
            .with_operation(Operation::new("query", input, output)),
    )
}

fn bench_build_request(c: &mut Criterion) {
    let client = Client::new(catalog(), (), Config::default());
    let keywords: Object = [("kind", Value::from("report")), ("limit", Value::Int(10))]
        .into_iter()
        .collect();
    c.bench_function("zsoap_build_request", |b| {
        b.iter(|| client.build_request("query", &[], black_box(&keywords), None))
    });
}

fn bench_parse_response(c: &mut Criterion) {
    let client = Client::new(catalog(), (), Config::default());
    c.bench_function("zsoap_parse_multiref_response", |b| {
        b.iter(|| client.parse_response(black_box(MULTIREF_RESPONSE.as_bytes()), Some("query")))
    });
}

fn bench_parse_raw(c: &mut Criterion) {
    let client = Client::new(catalog(), (), Config::default());
    c.bench_function("zsoap_parse_raw_response", |b| {
        b.iter(|| client.parse_response(black_box(MULTIREF_RESPONSE.as_bytes()), None))
    });
}

criterion_group!(benches, bench_build_request, bench_parse_response, bench_parse_raw);
criterion_main!(benches);
