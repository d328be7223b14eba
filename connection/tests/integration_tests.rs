use std::sync::Arc;

use common::value::{ColumnType, Value};
use common::Row;
use connection::engine::{ColumnDescriptor, PreparedDescriptor, QueryEngine, QueryOutcome};
use connection::handshake::{scramble_password, AllowAll, InitialHandshake};
use connection::packet::codec::{read_packet, write_packet};
use connection::session::Session;

struct EchoEngine;

impl QueryEngine for EchoEngine {
    fn execute_query(&self, _session: &mut Session, sql: &str) -> common::err::CResult<Vec<QueryOutcome>> {
        if sql.eq_ignore_ascii_case("select 1") {
            let columns = Arc::<[String]>::from(vec!["1".to_string()].into_boxed_slice());
            let row = Row::new(columns, vec![Value::Int(1)]);
            Ok(vec![QueryOutcome::Rows { columns: vec![ColumnDescriptor::new("1", ColumnType::Int)], rows: vec![row] }])
        } else {
            Ok(vec![QueryOutcome::Affected { rows_affected: 1, last_insert_id: 0, warnings: 0 }])
        }
    }

    fn prepare(&self, _session: &mut Session, _sql: &str) -> common::err::CResult<PreparedDescriptor> {
        Ok(PreparedDescriptor { statement_id: 1, param_count: 0, column_count: 0, columns: Vec::new() })
    }

    fn execute_prepared(&self, _session: &mut Session, _stmt_id: u32, _params: &[Value]) -> common::err::CResult<QueryOutcome> {
        Ok(QueryOutcome::Affected { rows_affected: 0, last_insert_id: 0, warnings: 0 })
    }

    fn close_prepared(&self, _session: &mut Session, _stmt_id: u32) {}

    fn use_database(&self, _session: &mut Session, _name: &str) -> common::err::CResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn full_handshake_and_query_round_trip() {
    let (server_side, mut client_side) = tokio::io::duplex(16 * 1024);

    let server = tokio::spawn(async move {
        connection::dispatch::serve_connection(
            server_side,
            1,
            "8.0.34-gateway",
            Arc::new(AllowAll),
            Arc::new(EchoEngine),
            binlog::ChecksumType::Crc32,
        )
        .await
    });

    let (handshake_payload, _seq) = read_packet(&mut client_side).await.unwrap();
    assert_eq!(handshake_payload[0], connection::handshake::PROTOCOL_VERSION_10);

    let scramble: [u8; 20] = handshake_payload[9..17]
        .iter()
        .chain(handshake_payload[45..57].iter())
        .copied()
        .collect::<Vec<u8>>()
        .try_into()
        .unwrap();
    let response_bytes = build_handshake_response("root", &scramble_password("", &scramble));
    write_packet(&mut client_side, &response_bytes, 1).await.unwrap();

    let (ok_payload, _) = read_packet(&mut client_side).await.unwrap();
    assert_eq!(ok_payload[0], 0x00);

    write_packet(&mut client_side, b"\x03select 1", 0).await.unwrap();
    let (column_count, _) = read_packet(&mut client_side).await.unwrap();
    assert_eq!(column_count[0], 1);
    let (_col_def, _) = read_packet(&mut client_side).await.unwrap();
    let (_eof, _) = read_packet(&mut client_side).await.unwrap();
    let (row, _) = read_packet(&mut client_side).await.unwrap();
    assert_eq!(row[0], 1); // length-encoded "1"

    write_packet(&mut client_side, &[0x01], 0).await.unwrap(); // COM_QUIT
    drop(client_side);
    server.await.unwrap().unwrap();
}

fn build_handshake_response(username: &str, auth_response: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    let caps = connection::declar::CapabilityFlags::default_server().bits();
    buf.extend_from_slice(&caps.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.push(45);
    buf.extend_from_slice(&[0u8; 23]);
    buf.extend_from_slice(username.as_bytes());
    buf.push(0);
    buf.push(auth_response.len() as u8);
    buf.extend_from_slice(auth_response);
    buf
}
