// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Basics of producing and consuming a message through the buffer contract.
//!
//! 1. We create an `AllocSite` over a memory pool.
//! 2. We acquire an output buffer from the site and encode a message into it.
//! 3. We wrap the finished backing as an input buffer and decode the message.

use serbuf::{AllocSite, Error, GlobalPool, InputBuf, OutputBuf, PooledInputBuf};

fn main() -> Result<(), Error> {
    // The memory pool in real-world code would be provided by the application framework.
    let mut site = AllocSite::new(GlobalPool::new());

    let message = produce_message(&mut site)?;
    consume_message(message)?;

    Ok(())
}

fn produce_message(site: &mut AllocSite<GlobalPool>) -> Result<PooledInputBuf<GlobalPool>, Error> {
    // Our message consists of this many "words" of data.
    const MESSAGE_LEN_WORDS: usize = 1000;

    println!(
        "Predicted output size for this site is {} bytes.",
        site.handle().next_receive_size()
    );

    let mut buf = site.output_buf()?;

    // Each word is just an incrementing binary-serialized number, starting from 0.
    // Asking the flat view for the full message size up front grows the backing once
    // instead of word by word.
    let mut view = buf.as_flat_view(Some(MESSAGE_LEN_WORDS * size_of::<u64>()))?;

    (0..MESSAGE_LEN_WORDS).for_each(|word| {
        view.put_num_le(word as u64);
    });

    drop(view);

    println!("Encoded {} bytes.", buf.size());

    // Completion commits the written bytes and teaches the site the actual size, so
    // the next output buffer at this site starts out large enough.
    let finished = buf.complete()?;

    Ok(site.input_buf(finished))
}

fn consume_message(mut message: PooledInputBuf<GlobalPool>) -> Result<(), Error> {
    // We read the message and calculate the sum of all the words in it.
    let mut sum: u64 = 0;

    for word in message.as_flat_view()?.chunks_exact(size_of::<u64>()) {
        let word = u64::from_le_bytes(word.try_into().map_err(|_| {
            Error::ContractViolation("message length is not a whole number of words".to_string())
        })?);

        sum = sum.saturating_add(word);
    }

    println!("Message received. The sum of all words in the message is {sum}.");

    // Returning the storage to the pool lets the next message reuse it.
    assert!(message.release());

    Ok(())
}
