use daemon_core::{HashError, HashFlags, HashTable, KeyMode};
use std::rc::Rc;

#[derive(Debug)]
struct Command {
    name: String,
    min_params: u8,
}

fn command(name: &str, min_params: u8) -> Rc<Command> {
    Rc::new(Command {
        name: name.to_string(),
        min_params,
    })
}

fn command_table(capacity: usize, flags: HashFlags) -> HashTable<Rc<Command>> {
    HashTable::new(
        "commands",
        capacity,
        KeyMode::Str { max_len: 0 },
        flags,
        |c: &Command| c.name.as_bytes(),
    )
    .expect("valid table")
}

#[test]
fn distinct_keys_round_trip() {
    let mut t = command_table(64, HashFlags::default().case_insensitive());
    let names = ["PRIVMSG", "NOTICE", "JOIN", "PART", "QUIT", "NICK", "MODE"];
    let cmds: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, n)| command(n, i as u8))
        .collect();
    for c in &cmds {
        t.insert(c.clone());
    }
    for c in &cmds {
        let found = t.find(c.name.to_lowercase().as_bytes()).expect("present");
        assert!(Rc::ptr_eq(found, c));
    }
    for c in &cmds {
        t.delete(c).expect("indexed");
        assert!(t.find(c.name.as_bytes()).is_none());
    }
    assert!(t.is_empty());
}

/// Two keys whose folded hashes are identical but which differ under a
/// case-sensitive comparator must still resolve to the right record, even
/// when everything shares one bucket.
#[test]
fn full_hash_collision_resolved_by_comparator() {
    let mut t: HashTable<Rc<Command>> = HashTable::with_comparator(
        "collide",
        1,
        KeyMode::Str { max_len: 0 },
        HashFlags::default().case_insensitive(),
        |c: &Command| c.name.as_bytes(),
        |a: &[u8], b: &[u8]| a.cmp(b),
    )
    .unwrap();
    let upper = command("Foo", 1);
    let lower = command("foo", 2);
    t.insert(upper.clone());
    t.insert(lower.clone());

    assert_eq!(t.find(b"Foo").unwrap().min_params, 1);
    assert_eq!(t.find(b"foo").unwrap().min_params, 2);
    assert!(t.find(b"FOO").is_none());
}

#[test]
fn insertion_order_picks_duplicate() {
    let mut head = command_table(4, HashFlags::default());
    let mut tail = command_table(4, HashFlags::default().insert_tail());
    let r1 = command("KICK", 1);
    let r2 = command("KICK", 2);
    for t in [&mut head, &mut tail] {
        t.insert(r1.clone());
        t.insert(r2.clone());
    }
    assert!(Rc::ptr_eq(head.find(b"KICK").unwrap(), &r2));
    assert!(Rc::ptr_eq(tail.find(b"KICK").unwrap(), &r1));
}

#[test]
fn borrowed_records_work_too() {
    let cmds = vec![
        Command {
            name: "PING".into(),
            min_params: 1,
        },
        Command {
            name: "PONG".into(),
            min_params: 1,
        },
    ];
    let mut t: HashTable<&Command> = HashTable::new(
        "borrowed",
        8,
        KeyMode::Str { max_len: 0 },
        HashFlags::default(),
        |c: &Command| c.name.as_bytes(),
    )
    .unwrap();
    for c in &cmds {
        t.insert(c);
    }
    assert_eq!(t.find(b"PONG").map(|c| c.name.as_str()), Some("PONG"));
    let removed = t.delete(&cmds[0]).unwrap();
    assert!(std::ptr::eq(removed, &cmds[0]));
}

#[test]
fn errors_display() {
    assert_eq!(
        HashError::ZeroCapacity.to_string(),
        "hash table capacity must be non-zero"
    );
    let t = command_table(2, HashFlags::default());
    assert_eq!(t.name(), "commands");
    assert_eq!(t.capacity(), 2);
    assert!(format!("{t:?}").contains("commands"));
}
