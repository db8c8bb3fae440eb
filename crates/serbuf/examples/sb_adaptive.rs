// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! How a site's size prediction adapts to the writes made through it.
//!
//! We use `TransparentPool` (requires the `test-util` feature) because it allocates
//! exactly the requested capacity, which makes the prediction directly observable.
//!
//! Run with: `cargo run --example sb_adaptive --features test-util`

use serbuf::{AllocSite, Error, OutputBuf, TransparentPool};

fn main() -> Result<(), Error> {
    let mut site = AllocSite::new(TransparentPool::new());

    println!(
        "Fresh site predicts {} bytes per output buffer.",
        site.handle().next_receive_size()
    );

    // A burst of large messages: the site grows its prediction after the first one,
    // so later messages no longer pay for mid-write growth.
    for round in 1..=3 {
        write_message(&mut site, 4000)?;

        println!(
            "After large message {round}: prediction is {} bytes.",
            site.handle().next_receive_size()
        );
    }

    // Traffic shifts to small messages. One small write is not enough to shrink -
    // a single outlier must not discard the learned size - but sustained small
    // traffic walks the prediction back down.
    for round in 1..=6 {
        write_message(&mut site, 100)?;

        println!(
            "After small message {round}: prediction is {} bytes.",
            site.handle().next_receive_size()
        );
    }

    Ok(())
}

fn write_message(site: &mut AllocSite<TransparentPool>, len: usize) -> Result<(), Error> {
    let mut buf = site.output_buf()?;

    let mut view = buf.as_flat_view(Some(len))?;
    for _ in 0..len {
        view.put_byte(66);
    }
    drop(view);

    drop(buf.complete()?);

    Ok(())
}
