// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2026 framemap contributors

use framemap::*;
use std::collections::HashMap;
use std::io::Write;

fn main() {
    let _time = std::time::Instant::now();

    let _ = simple_log::new(simple_log::LogConfig::default());

    let catalog = ElementCatalog::with_builtins();
    let mut params = HashMap::new();
    params.insert("width".to_string(), "640".to_string());
    params.insert("height".to_string(), "480".to_string());
    params.insert("count".to_string(), "30".to_string());

    let ElementBox::Source(mut source) = catalog.create("raw_video_source", &params).unwrap() else {
        panic!("raw_video_source must be a source")
    };
    let ElementBox::Transform(mut normalize) = catalog.create("tensor_normalize", &HashMap::new()).unwrap() else {
        panic!("tensor_normalize must be a transform")
    };
    let ElementBox::Sink(mut sink) = catalog.create("null_sink", &HashMap::new()).unwrap() else {
        panic!("null_sink must be a sink")
    };

    // Negotiate FrameInfo through the chain before any data flows.
    let source_info = source.get_output_info().unwrap().clone();
    println!("source: {:?} {:?}, {} planes", source_info.media_type, source_info.format, source_info.tensors.len());
    normalize.set_input_info(source_info).unwrap();
    sink.set_input_info(normalize.get_output_info().unwrap().clone()).unwrap();

    let cpu: ContextPtr = CpuContext::new();
    let mat_mapper = cpu.get_mapper(None, &cpu);

    let mut frames = 0usize;
    while let Some(frame) = source.read().unwrap() {
        // Zero-copy matrix view of the luma plane, then the normalize stage.
        let y = frame.tensor(0).unwrap();
        let mat = CpuToMat::new().map_tensor(y, AccessMode::Read).unwrap();
        if frames == 0 {
            let Tensor::Mat(m) = &*mat else { unreachable!() };
            println!("luma mat: dims {:?} steps {:?} channels {}", m.header().dims, m.header().steps, m.header().channels);
            println!("identity mapper cached: {}", mat_mapper.is_some());
        }

        let out = normalize.process(frame).unwrap();
        sink.write(out).unwrap();
        frames += 1;
    }

    println!("processed {frames} frames in {:.3}s", _time.elapsed().as_millis() as f64 / 1000.0);
    std::io::stdout().flush().unwrap();
}
