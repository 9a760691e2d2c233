//! GFF3 files in and out of a feature index.

use gfi_genomics::node::{CDS, MRNA};
use gfi_genomics::prelude::*;
use gfi_genomics::stream::drain;
use gfi_genomics::visitor::StatVisitor;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const EDEN: &str = "\
##gff-version 3
##sequence-region ctg123 1 1497228
ctg123\t.\tgene\t1000\t9000\t.\t+\t.\tID=gene00001;Name=EDEN
ctg123\t.\tTF_binding_site\t1000\t1012\t.\t+\t.\tID=tfbs00001;Parent=gene00001
ctg123\t.\tmRNA\t1050\t9000\t.\t+\t.\tID=mRNA00001;Parent=gene00001;Name=EDEN.1
ctg123\t.\tmRNA\t1050\t9000\t.\t+\t.\tID=mRNA00002;Parent=gene00001;Name=EDEN.2
ctg123\t.\tmRNA\t1300\t9000\t.\t+\t.\tID=mRNA00003;Parent=gene00001;Name=EDEN.3
ctg123\t.\texon\t1300\t1500\t.\t+\t.\tID=exon00001;Parent=mRNA00003
ctg123\t.\texon\t1050\t1500\t.\t+\t.\tID=exon00002;Parent=mRNA00001,mRNA00002
ctg123\t.\texon\t3000\t3902\t.\t+\t.\tID=exon00003;Parent=mRNA00001,mRNA00003
ctg123\t.\texon\t5000\t5500\t.\t+\t.\tID=exon00004;Parent=mRNA00001,mRNA00002,mRNA00003
ctg123\t.\texon\t7000\t9000\t.\t+\t.\tID=exon00005;Parent=mRNA00001,mRNA00002,mRNA00003
ctg123\t.\tCDS\t1201\t1500\t.\t+\t0\tID=cds00001;Parent=mRNA00001;Name=edenprotein.1
ctg123\t.\tCDS\t3000\t3902\t.\t+\t0\tID=cds00001;Parent=mRNA00001;Name=edenprotein.1
###
ctg123\t.\tgene\t20000\t25000\t.\t-\t.\tID=gene00002;Name=lonely
ctg999\t.\tgene\t100\t200\t.\t+\t.\tID=gene00003
";

fn gff3_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_add_gff3file() {
    let file = gff3_file(EDEN);
    let index: Arc<dyn FeatureIndex> = Arc::new(FeatureIndexMemory::new());
    let added = index.add_gff3file(file.path()).unwrap();
    assert_eq!(added, 4);

    assert_eq!(index.get_seqids().unwrap(), vec!["ctg123", "ctg999"]);
    assert_eq!(index.get_first_seqid().unwrap(), "ctg123");
    assert_eq!(index.get_range_for_seqid("ctg123").unwrap(), Range::new(1000, 25000));
    assert_eq!(index.get_orig_range_for_seqid("ctg123").unwrap(), Range::new(1, 1497228));
    assert_eq!(index.get_orig_range_for_seqid("ctg999").unwrap(), Range::new(100, 200));

    let hits = index.get_features_for_range("ctg123", Range::new(8000, 21000)).unwrap();
    assert_eq!(hits.len(), 2);
    let eden = &hits[0];
    assert_eq!(eden.get_attribute("Name"), Some("EDEN"));
    assert_eq!(eden.number_of_children(), 4);
    let mrnas: Vec<&FeatureNode> = eden.children().iter().filter(|c| c.has_type(MRNA)).collect();
    assert_eq!(mrnas.len(), 3);
    // multi-parent exons hang off their first parent
    assert_eq!(
        mrnas[0].exons(),
        vec![
            Range::new(1050, 1500),
            Range::new(3000, 3902),
            Range::new(5000, 5500),
            Range::new(7000, 9000),
        ]
    );
    assert_eq!(mrnas[2].exons(), vec![Range::new(1300, 1500)]);
    assert!(mrnas[0].has_cds());

    let origin = eden.origin();
    assert_eq!(origin.line_number, 3);
    assert_eq!(origin.filename, file.path().display().to_string());
}

#[test]
fn test_missing_file() {
    let index = FeatureIndexMemory::new();
    let err = index.add_gff3file("/nonexistent/annotation.gff3").unwrap_err();
    assert!(matches!(err, GfiError::Io(_)));
    assert!(!index.has_seqid("ctg123").unwrap());
}

#[test]
fn test_parse_error_leaves_index_untouched() {
    let file = gff3_file("##gff-version 3\nctg1\t.\tgene\t10\t20\t.\t+\t.\tID=g1\nctg1\t.\tgene\t30\n");
    let index = FeatureIndexMemory::new();
    match index.add_gff3file(file.path()) {
        Err(GfiError::Parse { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a parse error, got {:?}", other),
    }
    assert!(index.get_seqids().unwrap().is_empty());
}

#[test]
fn test_index_to_file_and_back() {
    let source = FeatureIndexMemory::new();
    source.add_gff3file(gff3_file(EDEN).path()).unwrap();

    let out = NamedTempFile::new().unwrap();
    let mut writer = Gff3Writer::create(out.path()).unwrap();
    let mut replay = FeatureInStream::new(&source).with_original_ranges(true);
    while let Some(node) = replay.next().unwrap() {
        writer.write_node(&node).unwrap();
    }
    writer.finish().unwrap();
    drop(writer);

    let copy = FeatureIndexMemory::new();
    copy.add_gff3file(out.path()).unwrap();
    assert_eq!(copy.get_seqids().unwrap(), source.get_seqids().unwrap());
    for seqid in source.get_seqids().unwrap() {
        assert_eq!(
            copy.get_orig_range_for_seqid(&seqid).unwrap(),
            source.get_orig_range_for_seqid(&seqid).unwrap()
        );
        let before = source.get_features_for_seqid(&seqid).unwrap();
        let after = copy.get_features_for_seqid(&seqid).unwrap();
        assert_eq!(before.len(), after.len());
    }

    let mut stats = StatVisitor::new();
    for node in drain(&mut Gff3InStream::from_path(out.path()).unwrap()).unwrap() {
        node.accept(&mut stats).unwrap();
    }
    assert_eq!(stats.regions, 2);
    assert_eq!(stats.genes, 3);
    assert_eq!(stats.mrnas, 3);
    assert_eq!(stats.exons, 5);
    assert_eq!(stats.cds, 2);
}

#[test]
fn test_out_stream_writes_pipeline_output() {
    let input = Gff3InStream::from_path(gff3_file(EDEN).path()).unwrap();
    let sorted = SortStream::new(input);
    let mut out = Gff3OutStream::new(sorted, Vec::new());
    let nodes = drain(&mut out).unwrap();
    assert_eq!(nodes.len(), 4);
    let text = String::from_utf8(out.into_inner().unwrap()).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "##gff-version 3");
    assert_eq!(lines[1], "##sequence-region   ctg123 1 1497228");
    assert!(lines[2].starts_with("ctg123\t.\tgene\t1000\t9000\t.\t+\t.\tID=gene00001;Name=EDEN"));
    assert_eq!(text.matches("\texon\t").count(), 5);
    assert_eq!(text.matches("\tCDS\t").count(), 2);
    assert!(text.contains("ID=exon00002;Parent=mRNA00001"));
    // three genes, one binding site, three mRNAs, five exons, two CDS
    assert_eq!(lines.iter().filter(|l| l.starts_with("ctg")).count(), 14);
    let first_cds = lines.iter().find(|l| l.contains(&format!("\t{}\t", CDS))).unwrap();
    assert!(first_cds.ends_with("ID=cds00001;Parent=mRNA00001;Name=edenprotein.1"));
    assert!(text.contains("ID=exon00001;Parent=mRNA00003"));
}
