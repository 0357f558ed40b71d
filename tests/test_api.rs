//!
//! Integration Test
//!
//! Test multiple APIs. Cross checking results between each other.
//!
#[cfg(test)]
mod genesis_tests {
    use blk_decoder::{
        decode_file, display_hex, double_hash, legacy_signing_bytes, verify_legacy_txid, BlkBuffer,
        BlkFile, BlockSummary, Eager, FromHex, Lazy, Network, ScanOptions, ScanState,
    };
    use std::path::PathBuf;

    const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";
    const GENESIS_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    /// utility function
    fn fixture_path() -> PathBuf {
        let mut crate_root_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_root_dir.push("./resources/tests/blk00000.dat");
        crate_root_dir
    }

    fn get_test_buffer() -> BlkBuffer {
        BlkFile::new(&fixture_path()).open().unwrap()
    }

    #[test]
    fn test_genesis_block() {
        let buf = get_test_buffer();
        let blocks = buf.read_blocks::<Eager>(&ScanOptions::new().strict(true)).unwrap();
        assert_eq!(blocks.len(), 1);

        let genesis = &blocks[0];
        assert_eq!(genesis.network(), Network::Bitcoin);
        assert_eq!(genesis.block_size(), 285);
        assert_eq!(genesis.end(), buf.len());
        assert_eq!(display_hex(&genesis.block_hash()), GENESIS_HASH);

        let header = genesis.header();
        assert_eq!(header.version, 1);
        assert_eq!(header.prev_hash, [0u8; 32]);
        assert_eq!(header.time, 1_231_006_505);
        assert_eq!(header.bits, 0x1d00_ffff);
        assert_eq!(header.nonce, 2_083_236_893);

        let coinbase = &genesis.transactions()[0];
        assert!(coinbase.is_coinbase());
        assert!(!coinbase.is_segwit());
        assert_eq!(coinbase.size(), 204);
        assert_eq!(coinbase.inputs()[0].script_sig().len(), 77);
        assert_eq!(coinbase.outputs()[0].value(), 5_000_000_000);
        assert_eq!(coinbase.outputs()[0].pk_script().len(), 67);
        assert_eq!(display_hex(&coinbase.txid()), GENESIS_TXID);
        assert_eq!(coinbase.to_bytes(), buf[coinbase.start()..coinbase.end()].to_vec());
    }

    #[test]
    fn test_lazy_equals_eager() {
        let buf = get_test_buffer();
        let eager = buf.read_blocks::<Eager>(&ScanOptions::new()).unwrap();
        let lazy = buf.read_blocks::<Lazy>(&ScanOptions::new()).unwrap();
        assert_eq!(lazy.len(), eager.len());
        for (l, e) in lazy.iter().zip(eager.iter()) {
            assert_eq!(&l.materialize(&buf).unwrap(), e);
            assert_eq!(BlockSummary::from_block(l, &buf).unwrap(), BlockSummary::from(e));
        }
        let tx = &lazy[0].transactions()[0];
        assert_eq!(tx.read_version(&buf).unwrap(), 1);
        assert!(tx.read_is_coinbase(&buf).unwrap());
        assert_eq!(display_hex(&tx.compute_txid(&buf).unwrap()), GENESIS_TXID);
    }

    #[test]
    fn test_idempotent() {
        let buf = get_test_buffer();
        let first = buf.read_blocks::<Lazy>(&ScanOptions::new()).unwrap();
        let second = buf.read_blocks::<Lazy>(&ScanOptions::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_genesis() {
        let buf = get_test_buffer();
        let blocks = buf.read_blocks::<Lazy>(&ScanOptions::new()).unwrap();
        let tx = &blocks[0].transactions()[0];

        // one input and one output: the preimage is the whole transaction
        let preimage = legacy_signing_bytes(tx, 0, 0, &buf).unwrap();
        assert_eq!(preimage, buf[tx.start()..tx.end()].to_vec());
        assert_eq!(display_hex(&double_hash(&preimage)), GENESIS_TXID);

        let mut known = [0u8; 32];
        known.copy_from_slice(&Vec::<u8>::from_hex(GENESIS_TXID).unwrap());
        assert_eq!(verify_legacy_txid(tx, &buf, &known).unwrap(), Some(true));
        known[0] ^= 0x01;
        assert_eq!(verify_legacy_txid(tx, &buf, &known).unwrap(), Some(false));

        assert!(legacy_signing_bytes(tx, 1, 0, &buf).is_err());
        assert!(legacy_signing_bytes(tx, 0, 1, &buf).is_err());
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = get_test_buffer().to_vec();
        bytes.extend_from_slice(&[0x13, 0x37, 0xde, 0xad, 0xbe, 0xef, 0x42, 0x00, 0x99, 0x7f]);
        let buf = BlkBuffer::from(bytes);
        let mut scanner = buf.scan::<Eager>(ScanOptions::new());
        assert_eq!(scanner.by_ref().count(), 1);
        assert_eq!(scanner.state(), ScanState::Done);
        assert!(scanner.stopped_by().is_none());
    }

    #[test]
    fn test_decode_file() {
        let (buf, blocks) = decode_file::<Lazy>(&fixture_path(), &ScanOptions::new()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            display_hex(&blocks[0].compute_block_hash(&buf).unwrap()),
            GENESIS_HASH
        );
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_map_equals_open() {
        let mapped = BlkFile::new(&fixture_path()).map().unwrap();
        assert!(mapped.is_mapped());
        assert_eq!(&mapped[..], &get_test_buffer()[..]);
        let blocks = mapped.read_blocks::<Eager>(&ScanOptions::new()).unwrap();
        assert_eq!(display_hex(&blocks[0].block_hash()), GENESIS_HASH);
    }
}

#[cfg(test)]
mod container_tests {
    use blk_decoder::{
        display_hex, encode_varint, read_blocks, read_blocks_par, scan_blocks, BlkBuffer,
        DecodeOptions, Eager, FieldCursor, Lazy, Network, ScanOptions, ScanState,
        ScriptLenEncoding, Transaction,
    };

    fn header() -> Vec<u8> {
        let mut header = vec![0x01, 0x00, 0x00, 0x00];
        header.extend_from_slice(&[0u8; 76]);
        header
    }

    /// the minimal 1 BTC transaction with empty scripts
    fn one_btc_tx() -> Vec<u8> {
        let mut tx = vec![0x01, 0x00, 0x00, 0x00, 0x01];
        tx.extend_from_slice(&[0u8; 36]);
        tx.extend_from_slice(&[0x00, 0xff, 0xff, 0xff, 0xff, 0x01]);
        tx.extend_from_slice(&[0x00, 0xe1, 0xf5, 0x05, 0x00, 0x00, 0x00, 0x00]);
        tx.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        tx
    }

    fn segwit_tx() -> Vec<u8> {
        let mut tx = vec![0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01];
        tx.extend_from_slice(&[0x11; 32]);
        tx.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0xfd, 0xff, 0xff, 0xff, 0x01]);
        tx.extend_from_slice(&90_000u64.to_le_bytes());
        tx.extend_from_slice(&[0x16, 0x00, 0x14]);
        tx.extend_from_slice(&[0x22; 20]);
        tx.extend_from_slice(&[0x02, 71]);
        tx.extend_from_slice(&[0x30; 71]);
        tx.push(33);
        tx.extend_from_slice(&[0x02; 33]);
        tx.extend_from_slice(&[0x00; 4]);
        tx
    }

    fn block(txs: &[Vec<u8>]) -> Vec<u8> {
        let mut body = header();
        body.extend(encode_varint(txs.len() as u64));
        for tx in txs {
            body.extend_from_slice(tx);
        }
        let mut raw = Network::Bitcoin.magic().to_vec();
        raw.extend_from_slice(&(body.len() as u32).to_le_bytes());
        raw.extend(body);
        raw
    }

    #[test]
    fn test_one_btc() {
        let buf = block(&[one_btc_tx()]);
        let blocks = read_blocks::<Eager>(&buf, &ScanOptions::new()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].n_transactions(), 1);
        let tx = &blocks[0].transactions()[0];
        assert_eq!(tx.outputs()[0].value(), 100_000_000);
        assert!(tx.inputs()[0].script_sig().is_empty());
        assert!(tx.outputs()[0].pk_script().is_empty());
        assert!(tx.inputs()[0].outpoint().txid.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_transaction_count() {
        let txs: Vec<Vec<u8>> = (0..300).map(|_| one_btc_tx()).collect();
        let buf = block(&txs);
        let blocks = read_blocks::<Lazy>(&buf, &ScanOptions::new()).unwrap();
        assert_eq!(blocks[0].n_transactions(), 300);
        assert_eq!(blocks[0].end(), buf.len());
    }

    #[test]
    fn test_segwit() {
        let raw = segwit_tx();
        let tx = Transaction::<Eager>::decode(&mut FieldCursor::new(&raw), &DecodeOptions::new())
            .unwrap();
        assert!(tx.is_segwit());
        assert_eq!(tx.size(), 191);
        assert_eq!(tx.to_stripped_bytes().len(), 82);
        assert_eq!(tx.witnesses()[0].items().len(), 2);
        assert_eq!(
            display_hex(&tx.txid()),
            "8daedf4374b780a9a425ce1b574ee5625a692b4c7067835f1ead837fe7d8480d"
        );
        assert_eq!(
            display_hex(&tx.wtxid()),
            "54aecdda9b3adf0c9e919e09610a3c0eec624154738039e74813a872c2d22ad8"
        );
        assert_eq!(tx.to_bytes(), raw);

        let lazy = Transaction::<Lazy>::decode(&mut FieldCursor::new(&raw), &DecodeOptions::new())
            .unwrap();
        assert_eq!(lazy.materialize(&raw).unwrap(), tx);
        assert_eq!(lazy.serialize(&raw).unwrap(), raw);
        assert_eq!(lazy.serialize_stripped(&raw).unwrap(), tx.to_stripped_bytes());
        assert_eq!(lazy.compute_wtxid(&raw).unwrap(), tx.wtxid());

        let items = lazy.witnesses()[0].read_items(&raw).unwrap();
        assert_eq!(items, tx.witnesses()[0].items());
        assert_eq!(items[0], &[0x30; 71][..]);
        assert_eq!(items[1], &[0x02; 33][..]);
    }

    #[test]
    fn test_mixed_container() {
        let mut buf = [
            block(&[one_btc_tx()]),
            block(&[one_btc_tx(), segwit_tx()]),
            block(&[segwit_tx()]),
        ]
        .concat();
        buf.extend_from_slice(&[0u8; 128]);
        let buf = BlkBuffer::from(buf);

        let sequential = buf.read_blocks::<Lazy>(&ScanOptions::new().strict(true)).unwrap();
        let parallel = read_blocks_par::<Lazy>(&buf, &DecodeOptions::new());
        assert_eq!(sequential.len(), 3);
        assert_eq!(parallel, sequential);
        assert!(sequential[2].transactions()[0].is_segwit());
    }

    #[test]
    fn test_truncated_container() {
        let first = block(&[one_btc_tx()]);
        let mut buf = [first.clone(), block(&[one_btc_tx(), one_btc_tx()])].concat();
        buf.truncate(buf.len() - 20);

        let mut scanner = scan_blocks::<Eager>(&buf, ScanOptions::new());
        assert_eq!(scanner.by_ref().count(), 1);
        assert_eq!(
            scanner.state(),
            ScanState::Truncated {
                offset: first.len()
            }
        );
        assert!(read_blocks::<Eager>(&buf, &ScanOptions::new().strict(true)).is_err());
    }

    #[test]
    fn test_single_byte_script_len() {
        // a 0xfd script length byte is a 253 byte script in legacy mode
        let mut tx = vec![0x01, 0x00, 0x00, 0x00, 0x01];
        tx.extend_from_slice(&[0u8; 36]);
        tx.push(0xfd);
        tx.extend_from_slice(&[0x51; 253]);
        tx.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0x01]);
        tx.extend_from_slice(&1u64.to_le_bytes());
        tx.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        let buf = block(&[tx]);

        let options = ScanOptions::new().decode(DecodeOptions::legacy());
        let blocks = read_blocks::<Eager>(&buf, &options).unwrap();
        assert_eq!(blocks[0].transactions()[0].inputs()[0].script_sig().len(), 253);

        let compact = DecodeOptions::legacy().script_len(ScriptLenEncoding::CompactSize);
        let options = ScanOptions::new().decode(compact).strict(true);
        assert!(read_blocks::<Eager>(&buf, &options).is_err());
    }
}
