use std::collections::HashMap;

use anyhow::Result;
use base64::prelude::*;
use bovw::pipeline::{encode_corpus, encode_to_file};
use bovw::writer::read_results;
use bovw::{BovwError, Codebook, Corpus, CorpusEntry, Descriptors, Pipeline, PipelineConfig};
use rstest::*;

/// 每两个字节组成一个二维描述符，空数据表示没有特征点，0xFF 开头表示无法解码
fn pair_extractor(id: &str, bytes: &[u8]) -> bovw::Result<Option<Descriptors>> {
    match bytes {
        [] => Ok(None),
        [0xFF, ..] => Err(BovwError::decode(id, "bad image")),
        _ => Descriptors::new(2, bytes.iter().map(|&b| b as f32).collect()).map(Some),
    }
}

/// 生成在若干个中心点附近的描述符
fn image(points: &[(u8, u8)], repeat: usize) -> Vec<u8> {
    let mut bytes = vec![];
    for i in 0..repeat {
        for &(x, y) in points {
            bytes.push(x + (i % 3) as u8);
            bytes.push(y + (i % 2) as u8);
        }
    }
    bytes
}

fn corpus() -> Corpus {
    Corpus::new(vec![
        CorpusEntry::memory("a.jpg", image(&[(10, 10)], 8)),
        CorpusEntry::memory("b.jpg", image(&[(10, 10), (100, 100)], 5)),
        CorpusEntry::memory("blank.jpg", vec![]),
        CorpusEntry::memory("c.jpg", image(&[(200, 20)], 6)),
        CorpusEntry::memory("broken.jpg", vec![0xFF, 0x00]),
        CorpusEntry::memory("d.jpg", image(&[(100, 100), (200, 20)], 4)),
    ])
    .unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig { vocabulary_size: 3, training_sample_size: 30, ..Default::default() }
}

#[test]
fn scenario_three_images() -> Result<()> {
    let codebook = Codebook::from_rows(&[[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]])?;

    let mut fixtures = HashMap::new();
    fixtures.insert("A", Descriptors::from_rows(&[[0.5, 0.5]; 10])?);
    fixtures.insert(
        "B",
        Descriptors::from_rows(&[[9.0, 0.0], [10.0, 1.0], [9.5, 0.5], [0.0, 9.0], [1.0, 10.0]])?,
    );
    let extractor =
        |id: &str, _: &[u8]| -> bovw::Result<Option<Descriptors>> { Ok(fixtures.get(id).cloned()) };

    let corpus = Corpus::new(vec![
        CorpusEntry::memory("A", vec![]),
        CorpusEntry::memory("B", vec![]),
        CorpusEntry::memory("C", vec![]),
    ])?;

    let encoded = encode_corpus(&corpus, &extractor, &codebook)?;
    let ln2 = (2f64).ln();

    assert_eq!(encoded.frequencies.vectors, vec![vec![10, 0, 0, 0], vec![0, 3, 2, 0]]);
    assert_eq!(encoded.frequencies.active.indices(), &[0, 1]);
    assert_eq!(encoded.tfidf.df, vec![1, 1, 1, 0]);
    assert_eq!(encoded.tfidf.idf, vec![ln2, ln2, ln2, 0.0]);
    assert_eq!(encoded.results["A"], vec![10.0 * ln2, 0.0, 0.0, 0.0]);
    assert_eq!(encoded.results["B"], vec![0.0, 3.0 * ln2, 2.0 * ln2, 0.0]);
    assert!(!encoded.results.contains_key("C"));
    Ok(())
}

#[test]
fn pruned_images_are_not_written() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let output = dir.path().join("cover.json");
    let corpus = corpus();

    let config = config();
    let pipeline = Pipeline::new(&config, &pair_extractor)?;
    let (codebook, report) = pipeline.run(&corpus, &output)?;

    assert_eq!(codebook.len(), 3);
    assert_eq!(report.corpus_size, 6);
    assert_eq!(report.active_size, 4);
    let excluded = report.exclusions.iter().map(|e| e.id.as_str()).collect::<Vec<_>>();
    assert_eq!(excluded, ["blank.jpg", "broken.jpg"]);

    let results = read_results(&output)?;
    let keys = results.keys().map(|k| k.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, ["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
    for v in results.values() {
        assert_eq!(v.len(), 3);
        assert!(v.iter().all(|x| x.is_finite() && *x >= 0.0));
    }
    Ok(())
}

#[test]
fn document_frequency_within_bounds() -> Result<()> {
    let corpus = corpus();
    let config = config();
    let pipeline = Pipeline::new(&config, &pair_extractor)?;
    let codebook = pipeline.train(&corpus)?;
    let encoded = pipeline.encode(&corpus, &codebook)?;

    let n = encoded.frequencies.active.len() as u32;
    assert!(encoded.tfidf.df.iter().all(|&d| d <= n));
    for (i, tf) in encoded.frequencies.iter() {
        let record = corpus.get(i).unwrap().load()?;
        assert_eq!(tf.iter().sum::<u32>() as usize, record.bytes.len() / 2);
    }
    Ok(())
}

#[test]
fn unused_words_have_zero_weight() -> Result<()> {
    // 第三个中心点远离所有描述符
    let codebook = Codebook::from_rows(&[[10.0, 10.0], [200.0, 20.0], [-500.0, -500.0]])?;
    let encoded = encode_corpus(&corpus(), &pair_extractor, &codebook)?;
    assert_eq!(encoded.tfidf.df[2], 0);
    assert!(encoded.results.values().all(|v| v[2] == 0.0));
    assert!(encoded.results.values().flatten().all(|x| x.is_finite()));
    Ok(())
}

#[test]
fn deterministic_output() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let (out1, out2) = (dir.path().join("1.json"), dir.path().join("2.json"));
    let corpus = corpus();

    Pipeline::new(&config(), &pair_extractor)?.run(&corpus, &out1)?;
    Pipeline::new(&config(), &pair_extractor)?.run(&corpus, &out2)?;

    assert_eq!(std::fs::read(&out1)?, std::fs::read(&out2)?);
    Ok(())
}

#[test]
fn rerun_overwrites_with_identical_result() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let output = dir.path().join("cover.json");
    let corpus = corpus();
    let config = config();
    let pipeline = Pipeline::new(&config, &pair_extractor)?;

    pipeline.run(&corpus, &output)?;
    let first = std::fs::read(&output)?;
    pipeline.run(&corpus, &output)?;
    assert_eq!(std::fs::read(&output)?, first);
    Ok(())
}

#[test]
fn train_then_encode_matches_run() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let corpus = corpus();
    let config = config();
    let pipeline = Pipeline::new(&config, &pair_extractor)?;

    let (codebook, _) = pipeline.run(&corpus, dir.path().join("run.json"))?;
    codebook.save(dir.path().join("codebook.bin"))?;
    let codebook = Codebook::open(dir.path().join("codebook.bin"))?;
    encode_to_file(&corpus, &pair_extractor, &codebook, dir.path().join("encode.json"))?;

    assert_eq!(
        std::fs::read(dir.path().join("run.json"))?,
        std::fs::read(dir.path().join("encode.json"))?
    );
    Ok(())
}

#[rstest]
#[case::smaller_than_corpus(2)]
#[case::equal_to_corpus(4)]
#[case::much_larger_than_corpus(500)]
fn sampling_with_replacement(#[case] training_sample_size: usize) -> Result<()> {
    let corpus = Corpus::new(vec![
        CorpusEntry::memory("a", image(&[(10, 10)], 3)),
        CorpusEntry::memory("b", image(&[(100, 100)], 3)),
        CorpusEntry::memory("c", image(&[(200, 20)], 3)),
        CorpusEntry::memory("d", image(&[(10, 10), (200, 20)], 2)),
    ])?;
    let config = PipelineConfig { training_sample_size, vocabulary_size: 2, ..config() };
    let pipeline = Pipeline::new(&config, &pair_extractor)?;
    let codebook = pipeline.train(&corpus)?;
    assert_eq!(codebook.len(), 2);
    Ok(())
}

#[test]
fn insufficient_training_data() -> Result<()> {
    let corpus = Corpus::new(vec![
        CorpusEntry::memory("a", image(&[(1, 1)], 2)),
        CorpusEntry::memory("b", vec![]),
    ])?;
    let config = PipelineConfig { vocabulary_size: 50, ..config() };
    let err = Pipeline::new(&config, &pair_extractor)?.train(&corpus).unwrap_err();
    assert!(matches!(err, BovwError::InsufficientData { required: 50, .. }));
    Ok(())
}

#[test]
fn all_images_pruned() -> Result<()> {
    let codebook = Codebook::from_rows(&[[0.0, 0.0]])?;
    let corpus =
        Corpus::new(vec![CorpusEntry::memory("a", vec![]), CorpusEntry::memory("b", vec![])])?;
    let err = encode_corpus(&corpus, &pair_extractor, &codebook).unwrap_err();
    assert!(matches!(err, BovwError::EmptyCorpus));
    Ok(())
}

#[test]
fn codebook_dimension_mismatch() -> Result<()> {
    let codebook = Codebook::from_rows(&[[0.0, 0.0, 0.0], [9.0, 9.0, 9.0]])?;
    // 空图片和无法解码的图片不影响判断
    let err = encode_corpus(&corpus(), &pair_extractor, &codebook).unwrap_err();
    assert!(matches!(err, BovwError::DimensionMismatch { expected: 3, found: 2 }));

    let dir = assert_fs::TempDir::new()?;
    let output = dir.path().join("cover.json");
    assert!(encode_to_file(&corpus(), &pair_extractor, &codebook, &output).is_err());
    assert!(!output.exists());
    Ok(())
}

#[test]
fn corpus_from_directory() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let files = dir.path().join("files");
    std::fs::create_dir(&files)?;
    for (name, bytes) in [
        ("1", image(&[(10, 10)], 8)),
        ("2", image(&[(100, 100), (10, 10)], 4)),
        ("3", vec![]),
        ("4", image(&[(200, 20)], 5)),
    ] {
        std::fs::write(files.join(name), BASE64_STANDARD.encode(bytes))?;
    }
    std::fs::write(files.join("5"), "***")?;

    let corpus = Corpus::scan(&files)?;
    assert_eq!(corpus.len(), 5);

    let output = dir.path().join("cover.json");
    let (_, report) = Pipeline::new(&config(), &pair_extractor)?.run(&corpus, &output)?;
    assert_eq!(report.exclusions.len(), 2);

    let results = read_results(&output)?;
    assert_eq!(results.keys().map(|k| k.as_str()).collect::<Vec<_>>(), ["1", "2", "4"]);
    Ok(())
}
