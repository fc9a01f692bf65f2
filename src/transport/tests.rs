use super::codec::{Command, FrameError, ServerFrame, is_valid_name};
use super::websocket::handle_text;
use crate::broker::Broker;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_decode_subscribe_and_unsubscribe() {
    assert_eq!(
        "SUBSCRIBE:news".parse::<Command>(),
        Ok(Command::Subscribe {
            channel: "news".to_string()
        })
    );
    assert_eq!(
        "UNSUBSCRIBE:News".parse::<Command>(),
        Ok(Command::Unsubscribe {
            channel: "News".to_string()
        })
    );
}

#[test]
fn test_decode_publish_splits_on_first_two_colons() {
    let command: Command = "PUBLISH:news:a:b::c".parse().unwrap();
    assert_eq!(
        command,
        Command::Publish {
            channel: "news".to_string(),
            body: "a:b::c".to_string(),
        }
    );

    let empty: Command = "PUBLISH:news:".parse().unwrap();
    assert_eq!(
        empty,
        Command::Publish {
            channel: "news".to_string(),
            body: String::new(),
        }
    );
}

#[test]
fn test_decode_rejects_malformed_commands() {
    assert_eq!("".parse::<Command>(), Err(FrameError::Empty));
    assert_eq!(
        "HELLO:news".parse::<Command>(),
        Err(FrameError::UnknownVerb("HELLO".to_string()))
    );
    assert_eq!(
        "subscribe:news".parse::<Command>(),
        Err(FrameError::UnknownVerb("subscribe".to_string()))
    );
    assert_eq!(
        "SUBSCRIBE".parse::<Command>(),
        Err(FrameError::MissingField {
            verb: "SUBSCRIBE",
            field: "channel"
        })
    );
    assert_eq!(
        "PUBLISH:news".parse::<Command>(),
        Err(FrameError::MissingField {
            verb: "PUBLISH",
            field: "body"
        })
    );
    assert_eq!(
        "SUBSCRIBE:".parse::<Command>(),
        Err(FrameError::InvalidName(String::new()))
    );
    assert_eq!(
        "SUBSCRIBE:a:b".parse::<Command>(),
        Err(FrameError::InvalidName("a:b".to_string()))
    );
    assert_eq!(
        "PUBLISH:a,b:hi".parse::<Command>(),
        Err(FrameError::InvalidName("a,b".to_string()))
    );
    assert_eq!(
        "PUBLISH:news:line\nbreak".parse::<Command>(),
        Err(FrameError::EmbeddedNewline)
    );
}

#[test]
fn test_name_validation() {
    assert!(is_valid_name("news"));
    assert!(is_valid_name("client-7d3c"));
    assert!(!is_valid_name(""));
    assert!(!is_valid_name("a:b"));
    assert!(!is_valid_name("a,b"));
}

#[test]
fn test_encode_server_frames() {
    assert_eq!(ServerFrame::Identity("client-1".to_string()).to_string(), "IDENTITY:client-1");
    assert_eq!(ServerFrame::Channels(Vec::new()).to_string(), "CHANNELS:");
    assert_eq!(
        ServerFrame::Channels(vec!["alerts".to_string(), "news".to_string()]).to_string(),
        "CHANNELS:alerts,news"
    );
    assert_eq!(ServerFrame::SubAck("news".to_string()).to_string(), "SUB-ACK:news");
    assert_eq!(ServerFrame::UnsubAck("news".to_string()).to_string(), "UNSUB-ACK:news");
    assert_eq!(
        ServerFrame::Msg {
            channel: "news".to_string(),
            sender: "client-1".to_string(),
            body: "x:y".to_string(),
        }
        .to_string(),
        "MSG:news:client-1:x:y"
    );
    assert_eq!(ServerFrame::not_subscribed().to_string(), "ERROR:401:Not subscribed");
    assert_eq!(ServerFrame::server_full().to_string(), "ERROR:503:Server full");
}

#[test]
fn test_decode_server_frames() {
    assert_eq!(
        "CHANNELS:".parse::<ServerFrame>(),
        Ok(ServerFrame::Channels(Vec::new()))
    );
    assert_eq!(
        "MSG:news:client-1:{\"a\":1}".parse::<ServerFrame>(),
        Ok(ServerFrame::Msg {
            channel: "news".to_string(),
            sender: "client-1".to_string(),
            body: "{\"a\":1}".to_string(),
        })
    );
    assert_eq!(
        "ERROR:401:Not subscribed".parse::<ServerFrame>(),
        Ok(ServerFrame::not_subscribed())
    );
    assert_eq!(
        "ERROR:abc:oops".parse::<ServerFrame>(),
        Err(FrameError::InvalidCode("abc".to_string()))
    );
    assert_eq!(
        "MSG:news:client-1".parse::<ServerFrame>(),
        Err(FrameError::MissingField {
            verb: "MSG",
            field: "body"
        })
    );
}

#[test]
fn test_encode_commands() {
    let publish = Command::Publish {
        channel: "news".to_string(),
        body: "hi:there".to_string(),
    };
    assert_eq!(publish.to_string(), "PUBLISH:news:hi:there");
    assert_eq!(WsMessage::from(publish).to_text().unwrap(), "PUBLISH:news:hi:there");
}

#[test]
fn test_handle_text_discards_garbage_and_runs_commands() {
    let broker = Mutex::new(Broker::default());
    let (tx, mut rx) = mpsc::channel::<WsMessage>(16);
    let client_id = broker.lock().unwrap().connect(tx).unwrap();
    while rx.try_recv().is_ok() {}

    handle_text(&broker, &client_id, "NONSENSE");
    handle_text(&broker, &client_id, "SUBSCRIBE:bad,name");
    assert!(rx.try_recv().is_err());

    handle_text(&broker, &client_id, "SUBSCRIBE:news");
    assert_eq!(rx.try_recv().unwrap().to_text().unwrap(), "SUB-ACK:news");

    let broker = broker.lock().unwrap();
    assert!(broker.channels().is_subscribed("news", &client_id));
    assert_eq!(broker.channels().len(), 1);
}
