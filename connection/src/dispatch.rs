use std::collections::VecDeque;
use std::sync::Arc;

use binlog::ChecksumType;
use common::err::{CResult, GatewayError};
use common::value::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, info_span, warn, Instrument};

use crate::declar::StatusFlags;
use crate::engine::{ColumnDescriptor, QueryEngine, QueryOutcome};
use crate::handshake::{Authenticator, HandshakeResponse, InitialHandshake};
use crate::packet::codec::{read_packet, write_packet};
use crate::packet::{encode_binary_row, encode_text_row, ColumnDefPacket, EofPacket, ErrPacket, OkPacket};
use crate::prepared::decode_stmt_execute;
use crate::replication::{handle_binlog_dump, BinlogDumpRequest, RegisterSlaveRequest};
use crate::session::{OpenCursor, Session};

pub const COM_QUIT: u8 = 0x01;
pub const COM_INIT_DB: u8 = 0x02;
pub const COM_QUERY: u8 = 0x03;
pub const COM_PING: u8 = 0x0e;
pub const COM_REGISTER_SLAVE: u8 = 0x15;
pub const COM_STMT_PREPARE: u8 = 0x16;
pub const COM_STMT_EXECUTE: u8 = 0x17;
pub const COM_STMT_SEND_LONG_DATA: u8 = 0x18;
pub const COM_STMT_CLOSE: u8 = 0x19;
pub const COM_STMT_RESET: u8 = 0x1a;
pub const COM_SET_OPTION: u8 = 0x1b;
pub const COM_STMT_FETCH: u8 = 0x1c;
pub const COM_BINLOG_DUMP: u8 = 0x12;

const CURSOR_TYPE_READ_ONLY: u8 = 0x01;

/// Drives one client connection end to end: handshake, authentication,
/// then the command loop until COM_QUIT or a connection error. Every
/// protocol-level failure is converted to an ERR packet at this single
/// point rather than being surfaced piecemeal by each handler.
pub async fn serve_connection<S>(
    mut stream: S,
    session_id: u32,
    server_version: &str,
    authenticator: Arc<dyn Authenticator>,
    engine: Arc<dyn QueryEngine>,
    checksum: ChecksumType,
) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let span = info_span!("connection", session_id);
    async {
        let mut session = Session::new(session_id);
        if perform_handshake(&mut stream, &mut session, server_version, authenticator.as_ref()).await.is_err() {
            return Ok(());
        }

        loop {
            let (payload, seq) = match read_packet(&mut stream).await {
                Ok(p) => p,
                Err(_) => break,
            };
            session.sequence_id = seq.wrapping_add(1);
            let Some(&command) = payload.first() else { break };
            if command == COM_QUIT {
                info!("client closed the connection");
                break;
            }

            let result = dispatch_command(&mut stream, &mut session, engine.as_ref(), command, &payload[1..], checksum).await;
            if let Err(err) = result {
                error!(error = %err, "command failed");
                let packet = ErrPacket::from_error(&err).encode();
                write_packet(&mut stream, &packet, session.sequence_id).await?;
            }
        }
        Ok(())
    }
    .instrument(span)
    .await
}

async fn perform_handshake<S>(
    stream: &mut S,
    session: &mut Session,
    server_version: &str,
    authenticator: &dyn Authenticator,
) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handshake = InitialHandshake::new(session.id, server_version);
    write_packet(stream, &handshake.encode(), 0).await?;

    let (payload, seq) = read_packet(stream).await?;
    let response = HandshakeResponse::decode(&payload)?;
    session.capabilities = session.capabilities & response.capabilities;
    session.current_database = response.database.clone();

    if let Err(err) = authenticator.authenticate(&response.username, &handshake.scramble, &response.auth_response) {
        let packet = ErrPacket::from_error(&err).encode();
        write_packet(stream, &packet, seq.wrapping_add(1)).await?;
        return Err(err);
    }

    let ok = OkPacket::new(0, 0, session.status).encode();
    write_packet(stream, &ok, seq.wrapping_add(1)).await?;
    Ok(())
}

async fn dispatch_command<S>(
    stream: &mut S,
    session: &mut Session,
    engine: &dyn QueryEngine,
    command: u8,
    payload: &[u8],
    checksum: ChecksumType,
) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match command {
        COM_PING => {
            let ok = OkPacket::new(0, 0, session.status).encode();
            write_packet(stream, &ok, session.sequence_id).await?;
        }
        COM_INIT_DB => {
            let database = String::from_utf8_lossy(payload).into_owned();
            engine.use_database(session, &database)?;
            session.current_database = Some(database);
            let ok = OkPacket::new(0, 0, session.status).encode();
            write_packet(stream, &ok, session.sequence_id).await?;
        }
        COM_QUERY => {
            let sql = String::from_utf8_lossy(payload).into_owned();
            let outcomes = engine.execute_query(session, &sql)?;
            write_outcomes(stream, session, &outcomes, false).await?;
        }
        COM_STMT_PREPARE => {
            let sql = String::from_utf8_lossy(payload).into_owned();
            let descriptor = engine.prepare(session, &sql)?;
            write_prepare_ok(stream, session, &descriptor).await?;
            session.register_prepared(descriptor);
        }
        COM_STMT_EXECUTE => {
            handle_stmt_execute(stream, session, engine, payload).await?;
        }
        COM_STMT_SEND_LONG_DATA => {
            if payload.len() >= 6 {
                let statement_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let param_index = u16::from_le_bytes([payload[4], payload[5]]);
                session.append_long_data(statement_id, param_index, &payload[6..]);
            }
            // no response, per the wire protocol
        }
        COM_STMT_CLOSE => {
            if payload.len() >= 4 {
                let statement_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                engine.close_prepared(session, statement_id);
                session.forget_prepared(statement_id);
            }
            // no response
        }
        COM_STMT_RESET => {
            if payload.len() >= 4 {
                let statement_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                session.clear_long_data(statement_id);
                session.close_cursor(statement_id);
            }
            let ok = OkPacket::new(0, 0, session.status).encode();
            write_packet(stream, &ok, session.sequence_id).await?;
        }
        COM_SET_OPTION => {
            let ok = OkPacket::new(0, 0, session.status).encode();
            write_packet(stream, &ok, session.sequence_id).await?;
        }
        COM_STMT_FETCH => {
            handle_stmt_fetch(stream, session, payload).await?;
        }
        COM_REGISTER_SLAVE => {
            let _request = RegisterSlaveRequest::decode(payload)?;
            let ok = OkPacket::new(0, 0, session.status).encode();
            write_packet(stream, &ok, session.sequence_id).await?;
        }
        COM_BINLOG_DUMP => {
            let request = BinlogDumpRequest::decode(payload)?;
            handle_binlog_dump(stream, session.sequence_id, &request, checksum).await?;
        }
        other => {
            warn!(command = other, "unsupported command");
            return Err(GatewayError::UnsupportedConstruct(format!("command byte 0x{other:02x}")));
        }
    }
    Ok(())
}

async fn handle_stmt_execute<S>(stream: &mut S, session: &mut Session, engine: &dyn QueryEngine, payload: &[u8]) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if payload.len() < 9 {
        return Err(GatewayError::Protocol("truncated COM_STMT_EXECUTE".into()));
    }
    let statement_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let flags = payload[4];
    let descriptor = session
        .prepared(statement_id)
        .cloned()
        .ok_or_else(|| GatewayError::Execution(format!("unknown prepared statement {statement_id}")))?;

    let mut request = decode_stmt_execute(payload, descriptor.param_count as usize)?;
    fill_in_long_data(session, statement_id, &mut request.params);

    let outcome = engine.execute_prepared(session, statement_id, &request.params)?;

    if flags & CURSOR_TYPE_READ_ONLY != 0 {
        if let QueryOutcome::Rows { columns, rows } = outcome {
            write_column_definitions(stream, session, &columns, true).await?;
            session.open_cursor(statement_id, OpenCursor { columns, remaining: VecDeque::from(rows) });
            return Ok(());
        }
    }
    write_outcomes(stream, session, &[outcome], true).await
}

fn fill_in_long_data(session: &mut Session, statement_id: u32, params: &mut [Value]) {
    for (index, param) in params.iter_mut().enumerate() {
        if let Some(bytes) = session.take_long_data(statement_id, index as u16) {
            *param = Value::Blob(bytes);
        }
    }
}

async fn handle_stmt_fetch<S>(stream: &mut S, session: &mut Session, payload: &[u8]) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if payload.len() < 8 {
        return Err(GatewayError::Protocol("truncated COM_STMT_FETCH".into()));
    }
    let statement_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let requested = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]) as usize;

    let mut seq = session.sequence_id;
    let cursor = session
        .cursor_mut(statement_id)
        .ok_or_else(|| GatewayError::Execution(format!("no open cursor for statement {statement_id}")))?;
    let column_types: Vec<_> = cursor.columns.iter().map(|c| c.column_type).collect();

    for _ in 0..requested {
        let Some(row) = cursor.remaining.pop_front() else { break };
        let bytes = encode_binary_row(&column_types, row.values());
        seq = write_packet(stream, &bytes, seq).await?;
    }

    let exhausted = cursor.remaining.is_empty();
    let mut status = session.status;
    status.insert(if exhausted { StatusFlags::SERVER_STATUS_LAST_ROW_SENT } else { StatusFlags::SERVER_STATUS_CURSOR_EXISTS });
    write_packet(stream, &EofPacket::new(status).encode(), seq).await?;
    if exhausted {
        session.close_cursor(statement_id);
    }
    Ok(())
}

async fn write_prepare_ok<S>(stream: &mut S, session: &mut Session, descriptor: &crate::engine::PreparedDescriptor) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = vec![0u8]; // OK marker for COM_STMT_PREPARE response
    header.extend_from_slice(&descriptor.statement_id.to_le_bytes());
    header.extend_from_slice(&descriptor.column_count.to_le_bytes());
    header.extend_from_slice(&descriptor.param_count.to_le_bytes());
    header.push(0); // filler
    header.extend_from_slice(&0u16.to_le_bytes()); // warning count
    let mut seq = write_packet(stream, &header, session.sequence_id).await?;

    for _ in 0..descriptor.param_count {
        // Parameter type is not reported (declared `VarChar`); clients
        // rebind types on every STMT_EXECUTE regardless.
        let packet = ColumnDefPacket::new("?", common::value::ColumnType::VarChar).encode();
        seq = write_packet(stream, &packet, seq).await?;
    }
    if descriptor.param_count > 0 && !session.capabilities.contains(crate::declar::CapabilityFlags::CLIENT_DEPRECATE_EOF) {
        seq = write_packet(stream, &EofPacket::new(session.status).encode(), seq).await?;
    }

    for column in &descriptor.columns {
        let packet = ColumnDefPacket::new(column.name.clone(), column.column_type).encode();
        seq = write_packet(stream, &packet, seq).await?;
    }
    if descriptor.column_count > 0 && !session.capabilities.contains(crate::declar::CapabilityFlags::CLIENT_DEPRECATE_EOF) {
        seq = write_packet(stream, &EofPacket::new(session.status).encode(), seq).await?;
    }
    session.sequence_id = seq;
    Ok(())
}

async fn write_column_definitions<S>(stream: &mut S, session: &mut Session, columns: &[ColumnDescriptor], keep_open: bool) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    crate::packet::codec::write_len_enc_int(&mut buf, columns.len() as u64);
    let mut seq = write_packet(stream, &buf, session.sequence_id).await?;
    for column in columns {
        let packet = ColumnDefPacket::new(column.name.clone(), column.column_type).encode();
        seq = write_packet(stream, &packet, seq).await?;
    }
    if !session.capabilities.contains(crate::declar::CapabilityFlags::CLIENT_DEPRECATE_EOF) {
        let mut status = session.status;
        if keep_open {
            status.insert(StatusFlags::SERVER_STATUS_CURSOR_EXISTS);
        }
        seq = write_packet(stream, &EofPacket::new(status).encode(), seq).await?;
    }
    session.sequence_id = seq;
    Ok(())
}

async fn write_outcomes<S>(stream: &mut S, session: &mut Session, outcomes: &[QueryOutcome], use_binary: bool) -> CResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for outcome in outcomes {
        match outcome {
            QueryOutcome::Affected { rows_affected, last_insert_id, warnings } => {
                let mut packet = OkPacket::new(*rows_affected, *last_insert_id, session.status);
                packet.warnings = *warnings;
                let bytes = packet.encode();
                session.sequence_id = write_packet(stream, &bytes, session.sequence_id).await?;
            }
            QueryOutcome::Rows { columns, rows } => {
                write_column_definitions(stream, session, columns, false).await?;
                let mut seq = session.sequence_id;
                for row in rows {
                    let bytes = if use_binary {
                        let types: Vec<_> = columns.iter().map(|c| c.column_type).collect();
                        encode_binary_row(&types, row.values())
                    } else {
                        encode_text_row(row.values())
                    };
                    seq = write_packet(stream, &bytes, seq).await?;
                }
                let deprecate_eof = session.capabilities.contains(crate::declar::CapabilityFlags::CLIENT_DEPRECATE_EOF);
                let bytes = if deprecate_eof {
                    OkPacket::new(rows.len() as u64, 0, session.status).encode()
                } else {
                    EofPacket::new(session.status).encode()
                };
                session.sequence_id = write_packet(stream, &bytes, seq).await?;
            }
        }
    }
    if outcomes.is_empty() {
        let ok = OkPacket::new(0, 0, session.status).encode();
        session.sequence_id = write_packet(stream, &ok, session.sequence_id).await?;
    }
    Ok(())
}
