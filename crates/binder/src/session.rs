// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Boot session threaded through every binding call

use ormbind_model::Metadata;

use crate::collector::MetadataCollector;
use crate::context::BindingContext;

/// State of one boot
///
/// Binding functions take the session by `&mut` and copy the context out
/// first, so capabilities stay readable while the collector is mutated.
#[derive(Debug)]
pub struct BootSession<'a> {
    pub context: BindingContext<'a>,
    pub collector: MetadataCollector,
}

impl<'a> BootSession<'a> {
    pub fn new(context: BindingContext<'a>) -> Self {
        Self {
            context,
            collector: MetadataCollector::new(),
        }
    }

    pub fn context(&self) -> BindingContext<'a> {
        self.context
    }

    pub fn into_metadata(self) -> Metadata {
        self.collector.into_metadata()
    }
}
