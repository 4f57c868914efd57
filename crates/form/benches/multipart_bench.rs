use std::convert::Infallible;
use std::hint::black_box;
use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures::SinkExt;
use futures::sink::{Drain, SinkMapErr, drain};
use micro_form::codec::multipart::{Boundary, MultipartDecoder};
use micro_form::connection::{FramerConfig, ReaderTransport, RequestFramer};
use micro_form::form::parse_form;
use micro_form::sink::FileSink;
use tokio::runtime::Runtime;
use tokio_util::codec::Decoder;

const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

/// Discards file content.
struct NullSink;

#[async_trait]
impl FileSink for NullSink {
    type Writer = SinkMapErr<Drain<Bytes>, fn(Infallible) -> io::Error>;

    async fn open(&mut self, _file_name: &str) -> io::Result<Self::Writer> {
        let never: fn(Infallible) -> io::Error = |never| match never {};
        Ok(drain().sink_map_err(never))
    }
}

/// A form with a few text fields and one file of `file_size` bytes whose content is
/// full of delimiter prefixes.
fn form_body(file_size: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for name in ["title", "author", "comment"] {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\nsome value\r\n").as_bytes(),
        );
    }

    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"data.bin\"\r\n\r\n").as_bytes(),
    );
    let pattern = b"\r\n--\r\n-0123456789abcdef";
    body.extend(pattern.iter().copied().cycle().take(file_size));
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: &[u8]) -> Vec<u8> {
    let head = format!(
        "POST /upload HTTP/1.1\r\nContent-Type: multipart/form-data; boundary={BOUNDARY}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    [head.as_bytes(), body].concat()
}

const SIZES: [usize; 3] = [4 * 1024, 256 * 1024, 4 * 1024 * 1024];

fn benchmark_multipart_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("multipart_decoder");

    for size in SIZES {
        let body = form_body(size);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter_batched_ref(
                || MultipartDecoder::new(Boundary::new(BOUNDARY).expect("boundary should be valid")),
                |decoder| {
                    let mut buffer = BytesMut::new();
                    for chunk in body.chunks(8 * 1024) {
                        buffer.extend_from_slice(chunk);
                        while let Some(part) = decoder.decode(&mut buffer).expect("body should be a valid form") {
                            black_box(part);
                        }
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_parse_form(criterion: &mut Criterion) {
    let runtime = Runtime::new().expect("tokio runtime should start");
    let mut group = criterion.benchmark_group("parse_form");

    for size in SIZES {
        let request = upload_request(&form_body(size));
        group.throughput(Throughput::Bytes(request.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.to_async(&runtime).iter(|| async {
                let mut transport = ReaderTransport::new(&request[..]);
                let mut framer = RequestFramer::new(FramerConfig::default());

                let (header, payload_size) =
                    framer.read_header(&mut transport).await.expect("header should be valid").expect("request");
                let mut body = framer.body(&mut transport, payload_size);
                let fields = parse_form(&header, &mut body, &mut NullSink).await.expect("body should be a valid form");
                black_box(fields);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_multipart_decoder, benchmark_parse_form);
criterion_main!(benches);
